//! Centroid vetting plots for target pixel files.
//!
//! When a transit-like dip shows up in a light curve, the first question is
//! whether it comes from the target or from a neighbouring star blended into
//! the aperture. This crate draws the two standard diagnostic images:
//!
//! - **Median image**: per-pixel median flux over the whole observation,
//!   with the pipeline aperture and the catalogue position of the target
//! - **Difference image**: median in-transit minus out-of-transit flux,
//!   folded over every observed transit, which lights up the pixels where
//!   the flux actually dropped
//!
//! # Core Modules
//!
//! ## Axes (`axes`)
//! A retained-mode plotting surface. Drawing calls record image layers,
//! rectangle patches, markers, labels, limits and a colorbar so that plots
//! can be inspected in tests and rendered later.
//!
//! ## Rendering (`render`)
//! Turns an [`axes::Axes`] scene into a PNG or SVG file with `plotters`.
//!
//! ## Centroid plots (`centroid`)
//! [`centroid::plot_pipeline_mask`], [`centroid::median_image`] and
//! [`centroid::difference_image`], plus the pure computations behind them.
//!
//! # Usage
//! ```rust,no_run
//! use shared::pixel_file::synthetic::SyntheticPixelFile;
//! use shared::TransitEphemeris;
//! use viz::centroid::{difference_image, median_image};
//! use viz::render::RenderConfig;
//!
//! let ephemeris = TransitEphemeris::new(1.3, 3.1, 0.15)?;
//! let tpf = SyntheticPixelFile {
//!     transit: Some(ephemeris),
//!     ..Default::default()
//! }
//! .build()?;
//!
//! median_image(&tpf, None)?.save("median.png", &RenderConfig::default())?;
//! difference_image(&tpf, &ephemeris, None)?.save("difference.png", &RenderConfig::default())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use shared::algo::StatsError;
use shared::wcs::WcsError;
use thiserror::Error;

/// Errors raised while computing or drawing centroid plots.
#[derive(Debug, Error)]
pub enum VizError {
    /// A median reduction had nothing to reduce or mismatched inputs.
    ///
    /// This is how a difference image with no detected transits fails.
    #[error("Statistics error: {0}")]
    Stats(#[from] StatsError),

    /// The target position could not be projected onto the cutout.
    #[error("WCS error: {0}")]
    Wcs(#[from] WcsError),

    /// An axes operation was called out of order.
    #[error("Axes error: {0}")]
    Axes(String),

    /// The plotting backend failed while drawing.
    #[error("Rendering error: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Standard Result type for all visualization operations.
pub type Result<T> = std::result::Result<T, VizError>;

pub mod axes;
pub mod centroid;
pub mod render;
