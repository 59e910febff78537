//! NaN-aware median reductions over stacks of pixel images.
//!
//! Flux cubes are indexed `[time, row, column]`. Every reduction here works
//! along the leading (time or epoch) axis and skips NaN samples, so a pixel
//! only becomes NaN when all of its samples are NaN. Reducing a stack with
//! no frames at all is an error rather than a silent NaN image.

use ndarray::{stack, Array2, ArrayView2, ArrayView3, Axis};
use thiserror::Error;

/// Failures of the stacking reductions.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StatsError {
    /// A reduction was asked to combine zero samples or frames.
    #[error("Cannot reduce an empty stack: {0}")]
    EmptyStack(String),

    /// Stacked images disagree in shape.
    #[error("Shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// A frame index lies outside the cube.
    #[error("Frame index {index} out of range for stack of {len} frames")]
    FrameOutOfRange { index: usize, len: usize },
}

/// Median of the non-NaN values, or NaN if none remain.
///
/// Sorts `values` in place after dropping NaN entries. For an even count the
/// two middle values are averaged.
fn nanmedian_in_place(values: &mut Vec<f64>) -> f64 {
    values.retain(|v| !v.is_nan());
    if values.is_empty() {
        return f64::NAN;
    }

    values.sort_by(|a, b| a.total_cmp(b));

    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Per-pixel median along the time axis of a `[time, row, column]` cube.
///
/// NaN samples are ignored. Pixels with only NaN samples come out as NaN.
///
/// # Errors
/// `StatsError::EmptyStack` when the cube has no frames.
pub fn nanmedian_axis0(cube: ArrayView3<f64>) -> Result<Array2<f64>, StatsError> {
    let (frames, rows, columns) = cube.dim();
    if frames == 0 {
        return Err(StatsError::EmptyStack(format!(
            "cube of {rows}x{columns} pixels has no frames"
        )));
    }

    let mut scratch = Vec::with_capacity(frames);
    Ok(Array2::from_shape_fn((rows, columns), |(r, c)| {
        scratch.clear();
        scratch.extend(cube.slice(ndarray::s![.., r, c]).iter().copied());
        nanmedian_in_place(&mut scratch)
    }))
}

/// Per-pixel NaN median over a subset of frames of a cube.
///
/// # Errors
/// * `StatsError::EmptyStack` when `frames` is empty
/// * `StatsError::FrameOutOfRange` when an index exceeds the cube length
pub fn nanmedian_frames(
    cube: ArrayView3<f64>,
    frames: &[usize],
) -> Result<Array2<f64>, StatsError> {
    let len = cube.len_of(Axis(0));
    if frames.is_empty() {
        return Err(StatsError::EmptyStack("no frames selected from cube".to_string()));
    }
    if let Some(&index) = frames.iter().find(|&&i| i >= len) {
        return Err(StatsError::FrameOutOfRange { index, len });
    }

    let selected = cube.select(Axis(0), frames);
    nanmedian_axis0(selected.view())
}

/// Per-pixel NaN median across a list of equally shaped images.
///
/// # Errors
/// * `StatsError::EmptyStack` when `images` is empty
/// * `StatsError::ShapeMismatch` when the images differ in shape
pub fn nanmedian_stack(images: &[Array2<f64>]) -> Result<Array2<f64>, StatsError> {
    let first = images
        .first()
        .ok_or_else(|| StatsError::EmptyStack("no images to combine".to_string()))?;

    let expected = first.dim();
    if let Some(bad) = images.iter().find(|img| img.dim() != expected) {
        return Err(StatsError::ShapeMismatch {
            expected,
            found: bad.dim(),
        });
    }

    let views: Vec<ArrayView2<f64>> = images.iter().map(|img| img.view()).collect();
    let cube = stack(Axis(0), &views).map_err(|_| StatsError::ShapeMismatch {
        expected,
        found: expected,
    })?;

    nanmedian_axis0(cube.view())
}
