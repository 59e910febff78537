//! Target pixel file data model.
//!
//! A target pixel file is a small detector cutout around one target: a
//! flux cube indexed `[time, row, column]`, one timestamp per cadence, the
//! target's sky position, a world coordinate transform for the cutout, the
//! cutout origin on the full detector, and the pipeline aperture mask.
//!
//! The [`PixelFile`] trait is the read-only contract consumed by the
//! plotting code. [`TargetPixelFile`] is the in-memory implementation.

pub mod synthetic;

use crate::wcs::{TanWcs, WorldToPixel};
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3};
use std::fmt;
use thiserror::Error;

/// Inconsistent pixel file contents.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PixelFileError {
    #[error("Time array has {time} samples but flux cube has {frames} frames")]
    TimeLengthMismatch { time: usize, frames: usize },

    #[error("Pipeline mask is {mask:?} but cutout is {cutout:?} (rows, columns)")]
    MaskShapeMismatch {
        mask: (usize, usize),
        cutout: (usize, usize),
    },
}

/// Read-only view of a target pixel file.
pub trait PixelFile {
    /// Flux cube indexed `[time, row, column]`.
    fn flux(&self) -> ArrayView3<'_, f64>;

    /// One timestamp per cadence.
    fn time(&self) -> ArrayView1<'_, f64>;

    /// Target right ascension in degrees.
    fn ra(&self) -> f64;

    /// Target declination in degrees.
    fn dec(&self) -> f64;

    /// Sky to cutout pixel transform.
    fn wcs(&self) -> &dyn WorldToPixel;

    /// Detector column of the cutout's first column.
    fn column(&self) -> i64;

    /// Detector row of the cutout's first row.
    fn row(&self) -> i64;

    /// Pipeline aperture, indexed `[row, column]` like one flux frame.
    fn pipeline_mask(&self) -> ArrayView2<'_, bool>;

    /// Flux cube dimensions `(time, rows, columns)`.
    fn shape(&self) -> (usize, usize, usize) {
        self.flux().dim()
    }

    /// Placement of the cutout on the detector.
    fn geometry(&self) -> CutoutGeometry {
        let (_, rows, columns) = self.shape();
        CutoutGeometry {
            column: self.column(),
            row: self.row(),
            rows,
            columns,
        }
    }
}

/// Location and size of a cutout in detector pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CutoutGeometry {
    /// Detector column of the first cutout column
    pub column: i64,
    /// Detector row of the first cutout row
    pub row: i64,
    /// Number of rows in the cutout
    pub rows: usize,
    /// Number of columns in the cutout
    pub columns: usize,
}

impl CutoutGeometry {
    /// Horizontal span `(column, column + columns)` in detector pixels.
    pub fn x_limits(&self) -> (f64, f64) {
        let start = self.column as f64;
        (start, start + self.columns as f64)
    }

    /// Vertical span `(row, row + rows)` in detector pixels.
    pub fn y_limits(&self) -> (f64, f64) {
        let start = self.row as f64;
        (start, start + self.rows as f64)
    }

    /// Image extent as `(left, right, bottom, top)`.
    pub fn extent(&self) -> (f64, f64, f64, f64) {
        let (left, right) = self.x_limits();
        let (bottom, top) = self.y_limits();
        (left, right, bottom, top)
    }

    pub fn pixel_count(&self) -> usize {
        self.rows * self.columns
    }

    /// Whether a detector coordinate falls on the cutout.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let (left, right, bottom, top) = self.extent();
        x >= left && x < right && y >= bottom && y < top
    }
}

impl fmt::Display for CutoutGeometry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}x{} cutout at column {}, row {}",
            self.columns, self.rows, self.column, self.row
        )
    }
}

/// In-memory target pixel file.
#[derive(Debug, Clone)]
pub struct TargetPixelFile {
    flux: Array3<f64>,
    time: Array1<f64>,
    pipeline_mask: Array2<bool>,
    wcs: TanWcs,
    ra: f64,
    dec: f64,
    column: i64,
    row: i64,
}

impl TargetPixelFile {
    /// Assemble a pixel file, checking that its arrays agree.
    ///
    /// The target position defaults to the WCS reference point and the
    /// cutout origin to `(0, 0)`; see [`with_target`](Self::with_target)
    /// and [`with_origin`](Self::with_origin).
    pub fn new(
        flux: Array3<f64>,
        time: Array1<f64>,
        pipeline_mask: Array2<bool>,
        wcs: TanWcs,
    ) -> Result<Self, PixelFileError> {
        let (frames, rows, columns) = flux.dim();

        if time.len() != frames {
            return Err(PixelFileError::TimeLengthMismatch {
                time: time.len(),
                frames,
            });
        }
        if pipeline_mask.dim() != (rows, columns) {
            return Err(PixelFileError::MaskShapeMismatch {
                mask: pipeline_mask.dim(),
                cutout: (rows, columns),
            });
        }

        let (ra, dec) = wcs.crval;
        Ok(Self {
            flux,
            time,
            pipeline_mask,
            wcs,
            ra,
            dec,
            column: 0,
            row: 0,
        })
    }

    /// Set the target sky position in degrees.
    pub fn with_target(mut self, ra: f64, dec: f64) -> Self {
        self.ra = ra;
        self.dec = dec;
        self
    }

    /// Set the detector position of the cutout's first column and row.
    pub fn with_origin(mut self, column: i64, row: i64) -> Self {
        self.column = column;
        self.row = row;
        self
    }

    pub fn tan_wcs(&self) -> &TanWcs {
        &self.wcs
    }
}

impl PixelFile for TargetPixelFile {
    fn flux(&self) -> ArrayView3<'_, f64> {
        self.flux.view()
    }

    fn time(&self) -> ArrayView1<'_, f64> {
        self.time.view()
    }

    fn ra(&self) -> f64 {
        self.ra
    }

    fn dec(&self) -> f64 {
        self.dec
    }

    fn wcs(&self) -> &dyn WorldToPixel {
        &self.wcs
    }

    fn column(&self) -> i64 {
        self.column
    }

    fn row(&self) -> i64 {
        self.row
    }

    fn pipeline_mask(&self) -> ArrayView2<'_, bool> {
        self.pipeline_mask.view()
    }
}
