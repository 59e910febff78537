//! Median and difference images for transit centroid vetting.
//!
//! Both plots share one layout: the image over the cutout's detector extent,
//! a marker at the target's catalogue position, one translucent square per
//! pipeline aperture pixel, pixel column/row axis labels, limits clamped to
//! the cutout, and a flux colorbar.
//!
//! # Difference image
//! For each observed transit the in-transit frames are median-combined and
//! the median of the frames just before and just after the transit is
//! subtracted. Only frames within half a period of that transit take part,
//! so neighbouring epochs never mix. The per-epoch differences are then
//! median-combined, which keeps one bad epoch from dominating the result.
//!
//! # Target position
//! The target pixel position is derived from the x (column) output of the
//! WCS projection for both axes: `tx = x + column` and `ty = x + row`. This
//! matches the established plots; see [`target_pixel_position`].

use crate::axes::{Axes, Marker, RectanglePatch};
use crate::Result;
use log::{debug, info, warn};
use ndarray::Array2;
use plotters::style::RGBColor;
use shared::algo::{find_plateau_peaks, nanmedian_axis0, nanmedian_frames, nanmedian_stack};
use shared::pixel_file::PixelFile;
use shared::transit::{TransitEphemeris, TransitMasks, TransitWindows};
use shared::wcs::WorldToPixel;

/// Colours, labels and sizes shared by the centroid plots.
#[derive(Debug, Clone, PartialEq)]
pub struct CentroidStyle {
    pub mask_color: RGBColor,
    pub mask_alpha: f64,
    pub target_color: RGBColor,
    pub target_alpha: f64,
    /// Target marker radius in screen pixels
    pub target_size: u32,
    pub x_label: String,
    pub y_label: String,
    pub colorbar_label: String,
}

impl Default for CentroidStyle {
    fn default() -> Self {
        Self {
            mask_color: RGBColor(255, 192, 203),
            mask_alpha: 0.5,
            target_color: RGBColor(255, 0, 0),
            target_alpha: 0.5,
            target_size: 6,
            x_label: "Pixel Column".to_string(),
            y_label: "Pixel Row".to_string(),
            colorbar_label: "Flux (e-/s)".to_string(),
        }
    }
}

/// Summary of one transit epoch that contributed to a difference image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochDifference {
    /// Cadence index of the in-transit peak
    pub peak_index: usize,
    /// Time of that cadence
    pub peak_time: f64,
    /// In-transit frames within the epoch's orbit window
    pub in_frames: usize,
    /// Out-of-transit frames within the epoch's orbit window
    pub out_frames: usize,
}

/// Result of [`compute_difference_image`].
#[derive(Debug, Clone, PartialEq)]
pub struct DifferenceImage {
    /// Median across epochs of in-transit minus out-of-transit flux
    pub image: Array2<f64>,
    /// One entry per epoch, in time order
    pub epochs: Vec<EpochDifference>,
}

/// Detector pixel position of the target, `(tx, ty)`.
///
/// Projects the target's sky position through the WCS (zero-based pixels)
/// and offsets by the cutout origin. Both coordinates are built from the
/// projected x value: `tx = x + column`, `ty = x + row`.
pub fn target_pixel_position<P: PixelFile + ?Sized>(tpf: &P) -> Result<(f64, f64)> {
    let (x, _y) = tpf.wcs().world_to_pixel(tpf.ra(), tpf.dec())?;
    Ok((x + tpf.column() as f64, x + tpf.row() as f64))
}

/// Per-pixel NaN median of the flux cube over time.
pub fn compute_median_image<P: PixelFile + ?Sized>(tpf: &P) -> Result<Array2<f64>> {
    Ok(nanmedian_axis0(tpf.flux())?)
}

/// Phase-folded in-transit minus out-of-transit image with default windows.
pub fn compute_difference_image<P: PixelFile + ?Sized>(
    tpf: &P,
    ephemeris: &TransitEphemeris,
) -> Result<DifferenceImage> {
    CentroidPlotter::default().compute_difference_image(tpf, ephemeris)
}

/// Draw one translucent unit square per pipeline mask pixel.
pub fn plot_pipeline_mask<'a, P: PixelFile + ?Sized>(ax: &'a mut Axes, tpf: &P) -> &'a mut Axes {
    CentroidPlotter::default().plot_pipeline_mask(ax, tpf)
}

/// Median flux image with aperture and target overlay.
///
/// Draws onto `ax` if given, otherwise onto a fresh [`Axes`].
pub fn median_image<P: PixelFile + ?Sized>(tpf: &P, ax: Option<Axes>) -> Result<Axes> {
    CentroidPlotter::default().median_image(tpf, ax)
}

/// Difference image with aperture and target overlay.
///
/// Fails with [`crate::VizError::Stats`] when no transit falls inside the
/// observation.
pub fn difference_image<P: PixelFile + ?Sized>(
    tpf: &P,
    ephemeris: &TransitEphemeris,
    ax: Option<Axes>,
) -> Result<Axes> {
    CentroidPlotter::default().difference_image(tpf, ephemeris, ax)
}

/// Centroid plot generator with configurable style and transit windows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CentroidPlotter {
    pub style: CentroidStyle,
    pub windows: TransitWindows,
}

impl CentroidPlotter {
    pub fn new(style: CentroidStyle, windows: TransitWindows) -> Self {
        Self { style, windows }
    }

    pub fn plot_pipeline_mask<'a, P: PixelFile + ?Sized>(
        &self,
        ax: &'a mut Axes,
        tpf: &P,
    ) -> &'a mut Axes {
        let column = tpf.column() as f64;
        let row = tpf.row() as f64;

        for ((i, j), &masked) in tpf.pipeline_mask().indexed_iter() {
            if masked {
                ax.add_patch(RectanglePatch {
                    x: j as f64 + column,
                    y: i as f64 + row,
                    width: 1.0,
                    height: 1.0,
                    color: self.style.mask_color,
                    alpha: self.style.mask_alpha,
                    filled: true,
                });
            }
        }

        ax
    }

    pub fn median_image<P: PixelFile + ?Sized>(&self, tpf: &P, ax: Option<Axes>) -> Result<Axes> {
        let image = compute_median_image(tpf)?;
        self.draw_pixel_image(tpf, image, ax)
    }

    pub fn difference_image<P: PixelFile + ?Sized>(
        &self,
        tpf: &P,
        ephemeris: &TransitEphemeris,
        ax: Option<Axes>,
    ) -> Result<Axes> {
        let difference = self.compute_difference_image(tpf, ephemeris)?;
        self.draw_pixel_image(tpf, difference.image, ax)
    }

    /// Median across transit epochs of the in-transit minus out-of-transit
    /// flux.
    ///
    /// Epochs are the plateau peaks of the in-transit mask. Each epoch only
    /// uses cadences within half a period of its peak.
    ///
    /// An epoch with no in-transit or no out-of-transit frames in its window
    /// (a transit next to a data gap) contributes an all-NaN image and so
    /// drops out of the final median.
    ///
    /// # Errors
    /// `VizError::Stats(StatsError::EmptyStack)` when no epoch is found.
    pub fn compute_difference_image<P: PixelFile + ?Sized>(
        &self,
        tpf: &P,
        ephemeris: &TransitEphemeris,
    ) -> Result<DifferenceImage> {
        let time = tpf.time().to_vec();
        let flux = tpf.flux();
        let (_, rows, columns) = flux.dim();
        let masks = TransitMasks::new(&time, ephemeris, &self.windows);
        let peaks = find_plateau_peaks(&masks.in_transit);
        let half_period = ephemeris.period / 2.0;

        let mut differences = Vec::with_capacity(peaks.len());
        let mut epochs = Vec::with_capacity(peaks.len());

        for &peak in &peaks {
            let peak_time = time[peak];
            let in_orbit = |i: &usize| (time[*i] - peak_time).abs() < half_period;

            let in_frames: Vec<usize> = (0..time.len())
                .filter(|&i| masks.in_transit[i])
                .filter(in_orbit)
                .collect();
            let out_frames: Vec<usize> = (0..time.len())
                .filter(|&i| masks.out_of_transit[i])
                .filter(in_orbit)
                .collect();

            if in_frames.is_empty() || out_frames.is_empty() {
                warn!(
                    "Epoch at t={peak_time:.4} skipped: {} in-transit, {} out-of-transit frames",
                    in_frames.len(),
                    out_frames.len()
                );
                differences.push(Array2::from_elem((rows, columns), f64::NAN));
            } else {
                if out_frames.len() < in_frames.len() {
                    warn!(
                        "Epoch at t={peak_time:.4} has {} out-of-transit frames for {} in transit",
                        out_frames.len(),
                        in_frames.len()
                    );
                }
                let in_image = nanmedian_frames(flux, &in_frames)?;
                let out_image = nanmedian_frames(flux, &out_frames)?;
                differences.push(in_image - out_image);
            }

            debug!(
                "Epoch at t={peak_time:.4}: {} in-transit, {} out-of-transit frames",
                in_frames.len(),
                out_frames.len()
            );
            epochs.push(EpochDifference {
                peak_index: peak,
                peak_time,
                in_frames: in_frames.len(),
                out_frames: out_frames.len(),
            });
        }

        info!("Combining difference images from {} transit epochs", epochs.len());
        let image = nanmedian_stack(&differences)?;

        Ok(DifferenceImage { image, epochs })
    }

    fn draw_pixel_image<P: PixelFile + ?Sized>(
        &self,
        tpf: &P,
        image: Array2<f64>,
        ax: Option<Axes>,
    ) -> Result<Axes> {
        let (tx, ty) = target_pixel_position(tpf)?;
        let geometry = tpf.geometry();

        let mut ax = ax.unwrap_or_default();
        ax.imshow(image, geometry.extent());
        ax.plot_marker(Marker {
            x: tx,
            y: ty,
            color: self.style.target_color,
            alpha: self.style.target_alpha,
            size: self.style.target_size,
        });
        self.plot_pipeline_mask(&mut ax, tpf);
        ax.set_xlabel(self.style.x_label.as_str())
            .set_ylabel(self.style.y_label.as_str())
            .set_xlim(geometry.x_limits())
            .set_ylim(geometry.y_limits());
        ax.add_colorbar(self.style.colorbar_label.as_str())?;

        Ok(ax)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VizError;
    use approx::assert_relative_eq;
    use ndarray::{Array1, Array3};
    use shared::algo::StatsError;
    use shared::wcs::TanWcs;
    use shared::TargetPixelFile;

    /// Cutout with a constant-per-pixel flux and a plus-shaped aperture.
    fn flat_tpf(frames: usize, rows: usize, columns: usize) -> TargetPixelFile {
        let flux = Array3::from_shape_fn((frames, rows, columns), |(_, r, c)| {
            100.0 + 10.0 * r as f64 + c as f64
        });
        let time = Array1::from_shape_fn(frames, |i| i as f64 * 0.1);
        let mut mask = Array2::from_elem((rows, columns), false);
        mask[[1, 1]] = true;
        mask[[0, 1]] = true;
        mask[[1, 0]] = true;
        let wcs = TanWcs::north_up((30.0, -20.0), (1.0, 2.0), 21.0).unwrap();

        TargetPixelFile::new(flux, time, mask, wcs)
            .unwrap()
            .with_origin(500, 700)
    }

    #[test]
    fn test_mask_overlay_one_patch_per_masked_pixel() {
        let tpf = flat_tpf(4, 3, 4);
        let mut ax = Axes::new();
        plot_pipeline_mask(&mut ax, &tpf);

        let corners: Vec<(f64, f64)> = ax.patches().iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(corners, vec![(501.0, 700.0), (500.0, 701.0), (501.0, 701.0)]);
        for patch in ax.patches() {
            assert_eq!((patch.width, patch.height), (1.0, 1.0));
            assert_eq!(patch.alpha, 0.5);
            assert!(patch.filled);
        }
    }

    #[test]
    fn test_mask_overlay_empty_mask() {
        let wcs = TanWcs::north_up((30.0, -20.0), (1.0, 1.0), 21.0).unwrap();
        let tpf = TargetPixelFile::new(
            Array3::zeros((2, 2, 2)),
            Array1::zeros(2),
            Array2::from_elem((2, 2), false),
            wcs,
        )
        .unwrap();

        let mut ax = Axes::new();
        plot_pipeline_mask(&mut ax, &tpf);
        assert!(ax.patches().is_empty());
    }

    #[test]
    fn test_target_position_reuses_column_coordinate() {
        let tpf = flat_tpf(2, 3, 4);
        let (tx, ty) = target_pixel_position(&tpf).unwrap();

        // The target sits on the WCS reference pixel (1, 2)
        assert_relative_eq!(tx, 1.0 + 500.0, epsilon = 1e-9);
        assert_relative_eq!(ty, 1.0 + 700.0, epsilon = 1e-9);
    }

    #[test]
    fn test_target_position_propagates_wcs_failure() {
        let tpf = flat_tpf(2, 3, 4).with_target(210.0, 20.0);
        assert!(matches!(
            target_pixel_position(&tpf),
            Err(VizError::Wcs(_))
        ));
    }

    #[test]
    fn test_median_image_scene() {
        let tpf = flat_tpf(5, 3, 4);
        let ax = median_image(&tpf, None).unwrap();

        let image = ax.image().unwrap();
        assert_eq!(image.data.dim(), (3, 4));
        assert_eq!(image.data[[2, 3]], 123.0);
        assert_eq!(
            (image.extent.left, image.extent.right, image.extent.bottom, image.extent.top),
            (500.0, 504.0, 700.0, 703.0)
        );

        assert_eq!(ax.x_limits(), (500.0, 504.0));
        assert_eq!(ax.y_limits(), (700.0, 703.0));
        assert_eq!(ax.x_label(), Some("Pixel Column"));
        assert_eq!(ax.y_label(), Some("Pixel Row"));
        assert_eq!(ax.patches().len(), 3);

        let marker = ax.markers()[0];
        assert_relative_eq!(marker.x, 501.0, epsilon = 1e-9);
        assert_relative_eq!(marker.y, 701.0, epsilon = 1e-9);
        assert_eq!(marker.color, RGBColor(255, 0, 0));

        let colorbar = ax.colorbar().unwrap();
        assert_eq!(colorbar.label, "Flux (e-/s)");
        assert_eq!(colorbar.range, (100.0, 123.0));
    }

    #[test]
    fn test_median_image_reuses_given_axes() {
        let tpf = flat_tpf(3, 3, 4);
        let mut ax = Axes::new();
        ax.set_title("Sector 14");

        let ax = median_image(&tpf, Some(ax)).unwrap();
        assert_eq!(ax.title(), Some("Sector 14"));
        assert!(ax.image().is_some());
    }

    #[test]
    fn test_median_image_values_match_time_series_median() {
        let mut tpf_flux = Array3::<f64>::zeros((6, 2, 2));
        let series = [5.0, 1.0, 9.0, 3.0, 7.0, 2.0];
        for (t, &v) in series.iter().enumerate() {
            tpf_flux[[t, 0, 0]] = v;
            tpf_flux[[t, 1, 1]] = -v;
        }
        let wcs = TanWcs::north_up((30.0, -20.0), (0.5, 0.5), 21.0).unwrap();
        let tpf = TargetPixelFile::new(
            tpf_flux,
            Array1::zeros(6),
            Array2::from_elem((2, 2), true),
            wcs,
        )
        .unwrap();

        let image = compute_median_image(&tpf).unwrap();
        assert_eq!(image[[0, 0]], 4.0);
        assert_eq!(image[[1, 1]], -4.0);
        assert_eq!(image[[0, 1]], 0.0);
    }

    /// Time series with transits every 2.0 days lasting 0.2 days, where
    /// in-transit flux is offset by `delta(epoch)` from the baseline.
    fn transiting_tpf(delta: impl Fn(usize) -> f64) -> (TargetPixelFile, TransitEphemeris) {
        let ephemeris = TransitEphemeris::new(1.0, 2.0, 0.2).unwrap();
        let cadence = 0.01;
        let frames = 600;
        let time = Array1::from_shape_fn(frames, |i| i as f64 * cadence);

        let in_transit = shared::transit::transit_mask(
            &time.to_vec(),
            ephemeris.period,
            0.9 * ephemeris.duration,
            ephemeris.epoch,
        );

        let flux = Array3::from_shape_fn((frames, 3, 3), |(t, r, c)| {
            let baseline = 50.0 + 3.0 * r as f64 + c as f64;
            if in_transit[t] {
                let epoch = ((time[t] - ephemeris.epoch) / ephemeris.period).round() as usize;
                baseline + delta(epoch)
            } else {
                baseline
            }
        });

        let wcs = TanWcs::north_up((30.0, -20.0), (1.0, 1.0), 21.0).unwrap();
        let tpf = TargetPixelFile::new(flux, time, Array2::from_elem((3, 3), false), wcs)
            .unwrap()
            .with_origin(10, 20);
        (tpf, ephemeris)
    }

    #[test]
    fn test_difference_image_uniform_offset() {
        let (tpf, ephemeris) = transiting_tpf(|_| 7.5);
        let result = compute_difference_image(&tpf, &ephemeris).unwrap();

        // Transits at t = 1, 3, 5 inside 0..6
        assert_eq!(result.epochs.len(), 3);
        for epoch in &result.epochs {
            assert!(epoch.in_frames > 0);
            assert!(epoch.out_frames > 0);
        }
        for &value in result.image.iter() {
            assert_relative_eq!(value, 7.5, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_difference_image_is_median_across_epochs() {
        let offsets = [1.0, 2.0, 30.0];
        let (tpf, ephemeris) = transiting_tpf(|epoch| offsets[epoch]);
        let result = compute_difference_image(&tpf, &ephemeris).unwrap();

        assert_eq!(result.epochs.len(), 3);
        let mean = offsets.iter().sum::<f64>() / 3.0;
        for &value in result.image.iter() {
            assert_relative_eq!(value, 2.0, epsilon = 1e-9);
            assert!((value - mean).abs() > 1.0);
        }
    }

    #[test]
    fn test_difference_image_epochs_are_transit_centres() {
        let (tpf, ephemeris) = transiting_tpf(|_| 1.0);
        let result = compute_difference_image(&tpf, &ephemeris).unwrap();

        let peak_times: Vec<f64> = result.epochs.iter().map(|e| e.peak_time).collect();
        for (found, expected) in peak_times.iter().zip([1.0, 3.0, 5.0]) {
            assert_relative_eq!(*found, expected, epsilon = 0.011);
        }
    }

    #[test]
    fn test_difference_image_without_transits_fails() {
        let (tpf, _) = transiting_tpf(|_| 1.0);
        // First transit after the end of the data
        let late = TransitEphemeris::new(100.0, 200.0, 0.2).unwrap();

        let err = compute_difference_image(&tpf, &late).unwrap_err();
        assert!(matches!(err, VizError::Stats(StatsError::EmptyStack(_))));

        let err = difference_image(&tpf, &late, None).unwrap_err();
        assert!(matches!(err, VizError::Stats(StatsError::EmptyStack(_))));
    }

    #[test]
    fn test_epoch_beside_data_gap_is_skipped() {
        let ephemeris = TransitEphemeris::new(1.0, 2.0, 0.2).unwrap();

        // Around t = 3 only the in-transit cadences and two far samples survive
        let cadences: Vec<usize> = (0..=240)
            .chain([250])
            .chain(292..=308)
            .chain([350])
            .chain(360..=600)
            .collect();
        let time = Array1::from_iter(cadences.iter().map(|&i| i as f64 * 0.01));
        let in_transit = shared::transit::transit_mask(&time.to_vec(), 2.0, 0.18, 1.0);

        let flux = Array3::from_shape_fn((time.len(), 2, 2), |(t, _, _)| {
            if in_transit[t] {
                95.0
            } else {
                100.0
            }
        });
        let wcs = TanWcs::north_up((30.0, -20.0), (0.5, 0.5), 21.0).unwrap();
        let tpf = TargetPixelFile::new(flux, time, Array2::from_elem((2, 2), false), wcs).unwrap();

        let result = compute_difference_image(&tpf, &ephemeris).unwrap();

        assert_eq!(result.epochs.len(), 3);
        assert!(result.epochs[1].in_frames > 0);
        assert_eq!(result.epochs[1].out_frames, 0);
        for &value in result.image.iter() {
            assert_relative_eq!(value, -5.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_non_square_cutout_spans_columns_horizontally() {
        let tpf = flat_tpf(4, 3, 5);
        let geometry = tpf.geometry();
        assert_eq!((geometry.rows, geometry.columns), (3, 5));

        let ax = median_image(&tpf, None).unwrap();
        let extent = ax.image().unwrap().extent;
        assert_eq!((extent.left, extent.right), (500.0, 505.0));
        assert_eq!((extent.bottom, extent.top), (700.0, 703.0));
        assert_eq!(ax.x_limits(), (500.0, 505.0));
        assert_eq!(ax.y_limits(), (700.0, 703.0));

        // Image rows run along y, so the last column lands at the right edge
        assert_eq!(ax.image().unwrap().data.dim(), (3, 5));
        assert_eq!(ax.image().unwrap().data[[0, 4]], 104.0);
    }

    #[test]
    fn test_difference_image_scene_matches_median_layout() {
        let (tpf, ephemeris) = transiting_tpf(|_| -4.0);
        let median = median_image(&tpf, None).unwrap();
        let difference = difference_image(&tpf, &ephemeris, None).unwrap();

        assert_eq!(difference.x_limits(), median.x_limits());
        assert_eq!(difference.y_limits(), median.y_limits());
        assert_eq!(difference.markers(), median.markers());
        assert_eq!(difference.patches(), median.patches());
        assert_eq!(difference.colorbar().unwrap().label, "Flux (e-/s)");

        let marker = difference.markers()[0];
        assert_relative_eq!(marker.x, 11.0, epsilon = 1e-9);
        assert_relative_eq!(marker.y, 21.0, epsilon = 1e-9);
    }

    #[test]
    fn test_custom_windows_change_comparison_frames() {
        let (tpf, ephemeris) = transiting_tpf(|_| 2.0);
        let narrow = CentroidPlotter::new(
            CentroidStyle::default(),
            TransitWindows {
                width_fraction: 0.5,
                comparison_offset: 1.5,
            },
        );

        let default = compute_difference_image(&tpf, &ephemeris).unwrap();
        let custom = narrow.compute_difference_image(&tpf, &ephemeris).unwrap();

        assert!(custom.epochs[0].in_frames < default.epochs[0].in_frames);
        // Narrow in-transit window still sits inside the injected signal
        for &value in custom.image.iter() {
            assert_relative_eq!(value, 2.0, epsilon = 1e-9);
        }
    }
}
