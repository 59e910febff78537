//! Retained-mode plotting surface.
//!
//! An [`Axes`] records what has been drawn on it instead of rasterising
//! immediately: an image layer with its extent, rectangle patches, point
//! markers, axis labels and limits, and an optional colorbar. The scene can
//! be inspected directly (which is how the centroid plots are tested) and
//! rendered to a file through [`crate::render`].
//!
//! Coordinates are data coordinates, i.e. detector pixels for the centroid
//! plots. Images use the lower-left origin convention: row 0 of the array is
//! drawn at the bottom of the extent.

use crate::{Result, VizError};
use ndarray::Array2;
use plotters::style::RGBColor;

/// Image placement as `(left, right, bottom, top)` in data coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
}

impl Extent {
    pub fn new(left: f64, right: f64, bottom: f64, top: f64) -> Self {
        Self {
            left,
            right,
            bottom,
            top,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }
}

impl From<(f64, f64, f64, f64)> for Extent {
    fn from((left, right, bottom, top): (f64, f64, f64, f64)) -> Self {
        Self::new(left, right, bottom, top)
    }
}

/// A 2-D array drawn as nearest-neighbour cells over an extent.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageLayer {
    /// Pixel values indexed `[row, column]`
    pub data: Array2<f64>,
    pub extent: Extent,
}

impl ImageLayer {
    /// Range of the finite values, or `None` if there are none.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |range, v| match range {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Data-space rectangle `[(x0, y0), (x1, y1)]` covered by array cell
    /// `(row, column)`.
    pub fn cell_bounds(&self, row: usize, column: usize) -> ((f64, f64), (f64, f64)) {
        let (rows, columns) = self.data.dim();
        let dx = self.extent.width() / columns as f64;
        let dy = self.extent.height() / rows as f64;

        let x0 = self.extent.left + dx * column as f64;
        let y0 = self.extent.bottom + dy * row as f64;
        ((x0, y0), (x0 + dx, y0 + dy))
    }
}

/// Axis-aligned rectangle anchored at its lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectanglePatch {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: RGBColor,
    pub alpha: f64,
    pub filled: bool,
}

/// Circular point marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub x: f64,
    pub y: f64,
    pub color: RGBColor,
    pub alpha: f64,
    /// Radius in screen pixels
    pub size: u32,
}

/// Colour scale legend attached to the image layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Colorbar {
    pub label: String,
    /// Value range mapped onto the colour scale
    pub range: (f64, f64),
}

/// Recorded plot scene.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Axes {
    title: Option<String>,
    image: Option<ImageLayer>,
    patches: Vec<RectanglePatch>,
    markers: Vec<Marker>,
    x_label: Option<String>,
    y_label: Option<String>,
    x_lim: Option<(f64, f64)>,
    y_lim: Option<(f64, f64)>,
    colorbar: Option<Colorbar>,
}

impl Axes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show a 2-D array over `extent`, replacing any previous image.
    pub fn imshow(&mut self, data: Array2<f64>, extent: impl Into<Extent>) -> &mut Self {
        self.image = Some(ImageLayer {
            data,
            extent: extent.into(),
        });
        self
    }

    pub fn add_patch(&mut self, patch: RectanglePatch) -> &mut Self {
        self.patches.push(patch);
        self
    }

    pub fn plot_marker(&mut self, marker: Marker) -> &mut Self {
        self.markers.push(marker);
        self
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> &mut Self {
        self.title = Some(title.into());
        self
    }

    pub fn set_xlabel(&mut self, label: impl Into<String>) -> &mut Self {
        self.x_label = Some(label.into());
        self
    }

    pub fn set_ylabel(&mut self, label: impl Into<String>) -> &mut Self {
        self.y_label = Some(label.into());
        self
    }

    pub fn set_xlim(&mut self, limits: (f64, f64)) -> &mut Self {
        self.x_lim = Some(limits);
        self
    }

    pub fn set_ylim(&mut self, limits: (f64, f64)) -> &mut Self {
        self.y_lim = Some(limits);
        self
    }

    /// Attach a colorbar spanning the finite range of the current image.
    ///
    /// An image without finite values gets the range `(0, 1)`.
    ///
    /// # Errors
    /// `VizError::Axes` if no image has been shown yet.
    pub fn add_colorbar(&mut self, label: impl Into<String>) -> Result<&mut Self> {
        let image = self.image.as_ref().ok_or_else(|| {
            VizError::Axes("colorbar requires an image on the axes".to_string())
        })?;

        let range = image.value_range().unwrap_or((0.0, 1.0));
        self.colorbar = Some(Colorbar {
            label: label.into(),
            range,
        });
        Ok(self)
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn image(&self) -> Option<&ImageLayer> {
        self.image.as_ref()
    }

    pub fn patches(&self) -> &[RectanglePatch] {
        &self.patches
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn x_label(&self) -> Option<&str> {
        self.x_label.as_deref()
    }

    pub fn y_label(&self) -> Option<&str> {
        self.y_label.as_deref()
    }

    pub fn colorbar(&self) -> Option<&Colorbar> {
        self.colorbar.as_ref()
    }

    /// Horizontal data range: explicit limits, else the image extent, else
    /// the bounding box of patches and markers, else `(0, 1)`.
    pub fn x_limits(&self) -> (f64, f64) {
        self.x_lim
            .or_else(|| self.image.as_ref().map(|i| (i.extent.left, i.extent.right)))
            .or_else(|| self.content_bounds().map(|(x, _)| x))
            .unwrap_or((0.0, 1.0))
    }

    /// Vertical data range, resolved like [`x_limits`](Self::x_limits).
    pub fn y_limits(&self) -> (f64, f64) {
        self.y_lim
            .or_else(|| self.image.as_ref().map(|i| (i.extent.bottom, i.extent.top)))
            .or_else(|| self.content_bounds().map(|(_, y)| y))
            .unwrap_or((0.0, 1.0))
    }

    fn content_bounds(&self) -> Option<((f64, f64), (f64, f64))> {
        let corners = self
            .patches
            .iter()
            .flat_map(|p| [(p.x, p.y), (p.x + p.width, p.y + p.height)])
            .chain(self.markers.iter().map(|m| (m.x, m.y)));

        corners.fold(None, |bounds, (x, y)| match bounds {
            None => Some(((x, x), (y, y))),
            Some(((x0, x1), (y0, y1))) => Some(((x0.min(x), x1.max(x)), (y0.min(y), y1.max(y)))),
        })
    }
}
