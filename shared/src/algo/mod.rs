//! Numeric building blocks for centroid vetting.
//!
//! NaN-aware median stacking of flux cubes and plateau peak detection for
//! boolean transit masks.

pub mod peaks;
pub mod stats;

pub use peaks::find_plateau_peaks;
pub use stats::{nanmedian_axis0, nanmedian_frames, nanmedian_stack, StatsError};
