//! Transit ephemerides and phase-window masks over a time series.

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid transit ephemeris parameters.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransitError {
    #[error("Orbital period must be positive and finite, got {0}")]
    InvalidPeriod(f64),

    #[error("Transit duration must be positive and finite, got {0}")]
    InvalidDuration(f64),

    #[error("Reference epoch must be finite, got {0}")]
    InvalidEpoch(f64),
}

/// Linear ephemeris of a transiting body.
///
/// All quantities share the time unit of the pixel file (days for TESS and
/// Kepler products).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitEphemeris {
    /// Mid-transit time of a reference event
    pub epoch: f64,
    /// Orbital period
    pub period: f64,
    /// Total transit duration
    pub duration: f64,
}

impl TransitEphemeris {
    pub fn new(epoch: f64, period: f64, duration: f64) -> Result<Self, TransitError> {
        if !epoch.is_finite() {
            return Err(TransitError::InvalidEpoch(epoch));
        }
        if !(period.is_finite() && period > 0.0) {
            return Err(TransitError::InvalidPeriod(period));
        }
        if !(duration.is_finite() && duration > 0.0) {
            return Err(TransitError::InvalidDuration(duration));
        }

        Ok(Self {
            epoch,
            period,
            duration,
        })
    }

    /// Predicted mid-transit time closest to `t`.
    pub fn nearest_transit(&self, t: f64) -> f64 {
        let n = ((t - self.epoch) / self.period).round();
        self.epoch + n * self.period
    }
}

/// Flag samples that fall inside a periodic window.
///
/// A sample at time `t` is flagged when it lies within `duration / 2` of a
/// predicted transit `epoch + n * period` for some integer `n`:
///
/// `|((t - epoch + period/2) mod period) - period/2| < duration/2`
///
/// The modulo is the floor (Euclidean) remainder, so times before `epoch`
/// are folded the same way as times after it. NaN times are never flagged.
pub fn transit_mask(time: &[f64], period: f64, duration: f64, epoch: f64) -> Vec<bool> {
    let half_period = 0.5 * period;
    let half_width = 0.5 * duration;

    time.iter()
        .map(|&t| ((t - epoch + half_period).rem_euclid(period) - half_period).abs() < half_width)
        .collect()
}

/// Shape of the in-transit and comparison windows, in units of the transit
/// duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitWindows {
    /// Width of every window as a fraction of the transit duration
    pub width_fraction: f64,
    /// Distance of the before/after comparison windows from mid-transit
    pub comparison_offset: f64,
}

impl Default for TransitWindows {
    fn default() -> Self {
        Self {
            width_fraction: 0.9,
            comparison_offset: 1.0,
        }
    }
}

/// In-transit and out-of-transit sample masks for one time series.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitMasks {
    pub in_transit: Vec<bool>,
    pub before: Vec<bool>,
    pub after: Vec<bool>,
    /// Union of `before` and `after`
    pub out_of_transit: Vec<bool>,
}

impl TransitMasks {
    /// Build the three phase windows around each predicted transit.
    ///
    /// All windows are `width_fraction * duration` wide. The in-transit
    /// window is centred on each predicted transit; the comparison windows
    /// are shifted `comparison_offset * duration` earlier and later.
    pub fn new(time: &[f64], ephemeris: &TransitEphemeris, windows: &TransitWindows) -> Self {
        let width = windows.width_fraction * ephemeris.duration;
        let shift = windows.comparison_offset * ephemeris.duration;

        let in_transit = transit_mask(time, ephemeris.period, width, ephemeris.epoch);
        let before = transit_mask(time, ephemeris.period, width, ephemeris.epoch - shift);
        let after = transit_mask(time, ephemeris.period, width, ephemeris.epoch + shift);

        let out_of_transit = before
            .iter()
            .zip(after.iter())
            .map(|(&b, &a)| b || a)
            .collect();

        let masks = Self {
            in_transit,
            before,
            after,
            out_of_transit,
        };

        debug!(
            "Transit masks over {} samples: {} in transit, {} out of transit",
            time.len(),
            masks.in_transit_count(),
            masks.out_of_transit_count()
        );

        masks
    }

    pub fn in_transit_count(&self) -> usize {
        self.in_transit.iter().filter(|&&m| m).count()
    }

    pub fn out_of_transit_count(&self) -> usize {
        self.out_of_transit.iter().filter(|&&m| m).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regular_time(start: f64, step: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| start + step * i as f64).collect()
    }

    #[test]
    fn test_ephemeris_validation() {
        assert!(TransitEphemeris::new(0.0, 3.0, 0.1).is_ok());
        assert_eq!(
            TransitEphemeris::new(0.0, 0.0, 0.1),
            Err(TransitError::InvalidPeriod(0.0))
        );
        assert_eq!(
            TransitEphemeris::new(0.0, 3.0, -0.1),
            Err(TransitError::InvalidDuration(-0.1))
        );
        assert!(matches!(
            TransitEphemeris::new(f64::NAN, 3.0, 0.1),
            Err(TransitError::InvalidEpoch(_))
        ));
    }

    #[test]
    fn test_nearest_transit() {
        let eph = TransitEphemeris::new(10.0, 2.5, 0.2).unwrap();
        assert_eq!(eph.nearest_transit(10.1), 10.0);
        assert_eq!(eph.nearest_transit(13.4), 12.5);
        assert_eq!(eph.nearest_transit(4.0), 5.0);
    }

    #[test]
    fn test_transit_mask_flags_each_epoch() {
        let time = [0.0, 0.04, 0.06, 1.0, 2.0, 1.97, 2.1, -2.0, -1.96];
        let mask = transit_mask(&time, 2.0, 0.1, 0.0);
        assert_eq!(
            mask,
            vec![true, true, false, false, true, true, false, true, true]
        );
    }

    #[test]
    fn test_transit_mask_ignores_nan_time() {
        let mask = transit_mask(&[f64::NAN, 0.0], 2.0, 0.1, 0.0);
        assert_eq!(mask, vec![false, true]);
    }

    #[test]
    fn test_masks_default_windows() {
        let time = regular_time(0.0, 0.01, 1000);
        let eph = TransitEphemeris::new(5.0, 4.0, 0.2).unwrap();
        let masks = TransitMasks::new(&time, &eph, &TransitWindows::default());

        let flagged = |mask: &[bool]| -> Vec<f64> {
            time.iter()
                .zip(mask)
                .filter(|(_, m)| **m)
                .map(|(&t, _)| t)
                .collect()
        };

        // In transit: |t - 5| < 0.09 (and around t = 1, 9)
        let in_times = flagged(&masks.in_transit);
        assert!(in_times.iter().all(|t| {
            let phase = (t - 5.0).rem_euclid(4.0);
            phase < 0.09 + 1e-9 || phase > 4.0 - 0.09 - 1e-9
        }));
        assert!(in_times.iter().any(|&t| (t - 5.0).abs() < 1e-9));

        // Before window centred on 4.8, after on 5.2
        let before = flagged(&masks.before);
        assert!(before.iter().any(|&t| (t - 4.8).abs() < 1e-9));
        assert!(!before.iter().any(|&t| (t - 5.0).abs() < 1e-9));
        let after = flagged(&masks.after);
        assert!(after.iter().any(|&t| (t - 5.2).abs() < 1e-9));

        // Windows do not overlap with the default shape
        for i in 0..time.len() {
            assert!(!(masks.in_transit[i] && masks.out_of_transit[i]));
            assert_eq!(
                masks.out_of_transit[i],
                masks.before[i] || masks.after[i]
            );
        }
        assert!(masks.out_of_transit_count() > masks.in_transit_count());
    }
}
