//! Data model and numerics for transit centroid vetting.
//!
//! This crate holds everything the plotting layer reads or reduces: the
//! target pixel file contract, the sky-to-pixel projection, NaN-aware
//! median stacking, transit phase windows, and peak detection over the
//! in-transit mask.

pub mod algo;
pub mod pixel_file;
pub mod transit;
pub mod wcs;

pub use pixel_file::{CutoutGeometry, PixelFile, PixelFileError, TargetPixelFile};
pub use transit::{TransitEphemeris, TransitMasks, TransitWindows};
pub use wcs::{TanWcs, WcsError, WorldToPixel};
