//! World coordinate transforms between the sky and cutout pixels.
//!
//! Implements the FITS gnomonic (`TAN`) projection: sky positions are
//! projected onto the plane tangent to the celestial sphere at the reference
//! point, then mapped to pixels through the inverse of the `CD` matrix.
//!
//! # Conventions
//! - **Sky**: right ascension and declination in degrees
//! - **Intermediate**: standard coordinates (xi, eta) in degrees, xi
//!   increasing toward east, eta toward north
//! - **Pixels**: zero-based `(x, y)`, x along columns and y along rows, with
//!   the centre of the first pixel at `(0, 0)`

use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures of the world coordinate transforms.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WcsError {
    /// The `CD` matrix cannot be inverted.
    #[error("CD matrix is singular (determinant {0:e})")]
    SingularMatrix(f64),

    /// The sky position lies 90 degrees or more from the reference point.
    #[error("Position (RA {ra:.6}, Dec {dec:.6}) is not in front of the tangent plane")]
    BehindTangentPlane { ra: f64, dec: f64 },

    /// An input coordinate was NaN or infinite.
    #[error("Non-finite coordinate: {0}")]
    NonFinite(String),
}

/// Mapping from sky coordinates to zero-based cutout pixel coordinates.
pub trait WorldToPixel {
    /// Project a sky position (degrees) to `(x, y)` pixel coordinates.
    fn world_to_pixel(&self, ra: f64, dec: f64) -> Result<(f64, f64), WcsError>;
}

/// Gnomonic (tangent plane) world coordinate system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TanWcs {
    /// Reference sky position (RA, Dec) in degrees (`CRVAL1`, `CRVAL2`).
    pub crval: (f64, f64),

    /// Zero-based pixel location of the reference point (`CRPIX - 1`).
    pub crpix: (f64, f64),

    /// Linear transform from pixel offsets to standard coordinates, degrees
    /// per pixel, row-major `[[CD1_1, CD1_2], [CD2_1, CD2_2]]`.
    pub cd: [[f64; 2]; 2],
}

impl TanWcs {
    /// Create a TAN projection from its FITS-style keywords.
    ///
    /// `crpix` is zero-based. Fails if `cd` is singular.
    pub fn new(crval: (f64, f64), crpix: (f64, f64), cd: [[f64; 2]; 2]) -> Result<Self, WcsError> {
        let wcs = Self { crval, crpix, cd };
        wcs.inverse_cd()?;
        Ok(wcs)
    }

    /// North-up, east-left projection with square pixels.
    ///
    /// `pixel_scale_arcsec` is the angular size of one pixel. RA increases
    /// toward decreasing x, matching the usual sky-image orientation.
    pub fn north_up(
        crval: (f64, f64),
        crpix: (f64, f64),
        pixel_scale_arcsec: f64,
    ) -> Result<Self, WcsError> {
        let scale = pixel_scale_arcsec / 3600.0;
        Self::new(crval, crpix, [[-scale, 0.0], [0.0, scale]])
    }

    fn cd_matrix(&self) -> Matrix2<f64> {
        Matrix2::new(self.cd[0][0], self.cd[0][1], self.cd[1][0], self.cd[1][1])
    }

    fn inverse_cd(&self) -> Result<Matrix2<f64>, WcsError> {
        let cd = self.cd_matrix();
        cd.try_inverse()
            .ok_or_else(|| WcsError::SingularMatrix(cd.determinant()))
    }

    /// Inverse mapping: zero-based pixel coordinates to (RA, Dec) in degrees.
    ///
    /// RA is normalised to `[0, 360)`.
    pub fn pixel_to_world(&self, x: f64, y: f64) -> Result<(f64, f64), WcsError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(WcsError::NonFinite(format!("pixel ({x}, {y})")));
        }

        let offset = Vector2::new(x - self.crpix.0, y - self.crpix.1);
        let standard = self.cd_matrix() * offset;
        let xi = standard.x.to_radians();
        let eta = standard.y.to_radians();

        let ra0 = self.crval.0.to_radians();
        let dec0 = self.crval.1.to_radians();

        let denom = dec0.cos() - eta * dec0.sin();
        let ra = ra0 + xi.atan2(denom);
        let dec = (eta * dec0.cos() + dec0.sin()).atan2((xi * xi + denom * denom).sqrt());

        Ok((ra.to_degrees().rem_euclid(360.0), dec.to_degrees()))
    }
}

impl WorldToPixel for TanWcs {
    fn world_to_pixel(&self, ra: f64, dec: f64) -> Result<(f64, f64), WcsError> {
        if !ra.is_finite() || !dec.is_finite() {
            return Err(WcsError::NonFinite(format!("sky position ({ra}, {dec})")));
        }

        let ra0 = self.crval.0.to_radians();
        let dec0 = self.crval.1.to_radians();
        let (ra_r, dec_r) = (ra.to_radians(), dec.to_radians());
        let d_ra = ra_r - ra0;

        // Cosine of the angular distance to the reference point
        let cos_c = dec_r.sin() * dec0.sin() + dec_r.cos() * dec0.cos() * d_ra.cos();
        if cos_c <= 0.0 {
            return Err(WcsError::BehindTangentPlane { ra, dec });
        }

        let xi = dec_r.cos() * d_ra.sin() / cos_c;
        let eta = (dec_r.sin() * dec0.cos() - dec_r.cos() * dec0.sin() * d_ra.cos()) / cos_c;

        let standard = Vector2::new(xi.to_degrees(), eta.to_degrees());
        let offset = self.inverse_cd()? * standard;

        Ok((self.crpix.0 + offset.x, self.crpix.1 + offset.y))
    }
}
