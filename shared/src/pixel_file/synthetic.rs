//! Synthetic target pixel files with injected transits.
//!
//! Produces small cutouts with Gaussian stellar profiles on a flat
//! background, optional Gaussian read noise, and a box-shaped transit on
//! either the target or a nearby contaminating star. Useful for exercising
//! the centroid plots where the true source of the dip is known.

use super::{PixelFileError, TargetPixelFile};
use crate::transit::{transit_mask, TransitEphemeris};
use crate::wcs::{TanWcs, WcsError};
use ndarray::{Array1, Array2, Array3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyntheticError {
    #[error("WCS error: {0}")]
    Wcs(#[from] WcsError),

    #[error("Pixel file error: {0}")]
    PixelFile(#[from] PixelFileError),

    #[error("Invalid noise parameters: {0}")]
    Noise(String),
}

/// A point source placed on the cutout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticStar {
    /// Zero-based cutout column of the star centre
    pub column: f64,
    /// Zero-based cutout row of the star centre
    pub row: f64,
    /// Total flux in e-/s
    pub flux: f64,
}

/// Which star the injected transit dims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitHost {
    #[default]
    Target,
    Contaminant,
}

/// Parameters of a synthetic pixel file.
#[derive(Debug, Clone)]
pub struct SyntheticPixelFile {
    pub rows: usize,
    pub columns: usize,
    pub cadences: usize,
    /// Time of the first cadence (days)
    pub start_time: f64,
    /// Spacing between cadences (days)
    pub cadence: f64,
    /// Flat background level per pixel (e-/s)
    pub background: f64,
    /// Standard deviation of the per-sample Gaussian noise (e-/s)
    pub noise_sigma: f64,
    /// Gaussian PSF width in pixels
    pub psf_sigma: f64,
    pub target: SyntheticStar,
    pub contaminant: Option<SyntheticStar>,
    pub transit: Option<TransitEphemeris>,
    /// Fractional flux drop of the host star during transit
    pub depth: f64,
    pub host: TransitHost,
    /// Target sky position in degrees
    pub ra: f64,
    pub dec: f64,
    pub pixel_scale_arcsec: f64,
    /// Detector (column, row) of the cutout's first pixel
    pub origin: (i64, i64),
    /// Pixels within this distance of the target join the pipeline mask
    pub aperture_radius: f64,
    pub seed: u64,
}

impl Default for SyntheticPixelFile {
    fn default() -> Self {
        Self {
            rows: 11,
            columns: 11,
            cadences: 1440,
            start_time: 0.0,
            cadence: 2.0 / 144.0,
            background: 50.0,
            noise_sigma: 5.0,
            psf_sigma: 0.8,
            target: SyntheticStar {
                column: 5.0,
                row: 5.0,
                flux: 20_000.0,
            },
            contaminant: None,
            transit: None,
            depth: 0.01,
            host: TransitHost::Target,
            ra: 84.291,
            dec: -80.469,
            pixel_scale_arcsec: 21.0,
            origin: (1204, 680),
            aperture_radius: 1.6,
            seed: 42,
        }
    }
}

impl SyntheticPixelFile {
    /// Timestamps of every cadence.
    pub fn time(&self) -> Array1<f64> {
        Array1::from_shape_fn(self.cadences, |i| self.start_time + self.cadence * i as f64)
    }

    /// Noise-free image of one star at unit flux scale.
    fn star_image(&self, star: &SyntheticStar) -> Array2<f64> {
        let norm = star.flux / (2.0 * PI * self.psf_sigma * self.psf_sigma);
        let two_sigma_sq = 2.0 * self.psf_sigma * self.psf_sigma;

        Array2::from_shape_fn((self.rows, self.columns), |(r, c)| {
            let dx = c as f64 - star.column;
            let dy = r as f64 - star.row;
            norm * (-(dx * dx + dy * dy) / two_sigma_sq).exp()
        })
    }

    fn pipeline_mask(&self) -> Array2<bool> {
        let radius_sq = self.aperture_radius * self.aperture_radius;
        Array2::from_shape_fn((self.rows, self.columns), |(r, c)| {
            let dx = c as f64 - self.target.column;
            let dy = r as f64 - self.target.row;
            dx * dx + dy * dy <= radius_sq
        })
    }

    /// Generate the pixel file.
    pub fn build(&self) -> Result<TargetPixelFile, SyntheticError> {
        let time = self.time();

        let target_image = self.star_image(&self.target);
        let contaminant_image = self
            .contaminant
            .as_ref()
            .map(|star| self.star_image(star))
            .unwrap_or_else(|| Array2::zeros((self.rows, self.columns)));

        let in_transit = match &self.transit {
            Some(eph) => transit_mask(&time.to_vec(), eph.period, eph.duration, eph.epoch),
            None => vec![false; self.cadences],
        };

        let mut rng = StdRng::seed_from_u64(self.seed);
        let noise = Normal::new(0.0, self.noise_sigma)
            .map_err(|e| SyntheticError::Noise(e.to_string()))?;

        let mut flux = Array3::zeros((self.cadences, self.rows, self.columns));
        for (t, mut frame) in flux.outer_iter_mut().enumerate() {
            let (target_scale, contaminant_scale) = match (in_transit[t], self.host) {
                (true, TransitHost::Target) => (1.0 - self.depth, 1.0),
                (true, TransitHost::Contaminant) => (1.0, 1.0 - self.depth),
                (false, _) => (1.0, 1.0),
            };

            frame.assign(&target_image);
            frame *= target_scale;
            frame.scaled_add(contaminant_scale, &contaminant_image);
            frame += self.background;

            if self.noise_sigma > 0.0 {
                frame.mapv_inplace(|v| v + noise.sample(&mut rng));
            }
        }

        let wcs = TanWcs::north_up(
            (self.ra, self.dec),
            (self.target.column, self.target.row),
            self.pixel_scale_arcsec,
        )?;

        let tpf = TargetPixelFile::new(flux, time, self.pipeline_mask(), wcs)?
            .with_target(self.ra, self.dec)
            .with_origin(self.origin.0, self.origin.1);

        Ok(tpf)
    }
}
