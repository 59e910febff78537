//! Rendering of [`Axes`] scenes to image files with `plotters`.
//!
//! Files ending in `.svg` go through the SVG backend, everything else through
//! the bitmap backend (PNG for `.png`). The image layer is coloured with the
//! viridis colour map; NaN cells are left blank.

use crate::axes::{Axes, Colorbar, ImageLayer};
use crate::{Result, VizError};
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::colors::colormaps::{ColorMap, ViridisRGB};
use plotters::style::FontTransform;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Output layout and typography.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Space around the chart in pixels
    pub margin: u32,
    /// Space reserved for tick labels and axis descriptions; 0 hides them
    pub label_area_size: u32,
    /// Width of the colorbar strip, including its labels
    pub colorbar_width: u32,
    pub font_family: String,
    pub caption_font_size: u32,
    pub label_font_size: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 900,
            height: 760,
            margin: 15,
            label_area_size: 55,
            colorbar_width: 140,
            font_family: "sans-serif".to_string(),
            caption_font_size: 24,
            label_font_size: 16,
        }
    }
}

impl RenderConfig {
    /// Save as pretty-printed JSON.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON; missing fields take their default values.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

fn render_err<E: std::fmt::Display>(err: E) -> VizError {
    VizError::Render(err.to_string())
}

/// Position of `value` within `range`, clamped to `[0, 1]`.
///
/// A degenerate range maps everything to the middle of the scale.
fn normalize(value: f64, (lo, hi): (f64, f64)) -> f64 {
    if hi > lo {
        ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
    } else {
        0.5
    }
}

fn colormap(value: f64, range: (f64, f64)) -> RGBColor {
    ViridisRGB.get_color(normalize(value, range))
}

impl Axes {
    /// Render the scene to `path`, choosing the backend from the extension.
    pub fn save<P: AsRef<Path>>(&self, path: P, config: &RenderConfig) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let size = (config.width, config.height);
        let is_svg = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));

        if is_svg {
            let root = SVGBackend::new(path, size).into_drawing_area();
            self.draw_on(&root, config)?;
        } else {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            self.draw_on(&root, config)?;
        }

        info!("Plot saved to: {}", path.display());
        Ok(())
    }

    /// Draw the scene onto an arbitrary `plotters` drawing area.
    pub fn draw_on<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        config: &RenderConfig,
    ) -> Result<()> {
        root.fill(&WHITE).map_err(render_err)?;

        let (total_width, _) = root.dim_in_pixel();
        let bar_width = match self.colorbar() {
            Some(_) => config.colorbar_width.min(total_width / 2),
            None => 0,
        };
        let (plot_area, bar_area) = root.split_horizontally(total_width - bar_width);

        let (x0, x1) = self.x_limits();
        let (y0, y1) = self.y_limits();
        let font = config.font_family.as_str();

        let mut builder = ChartBuilder::on(&plot_area);
        builder
            .margin(config.margin)
            .x_label_area_size(config.label_area_size)
            .y_label_area_size(config.label_area_size);
        if let Some(title) = self.title() {
            builder.caption(title, (font, config.caption_font_size));
        }
        let mut chart = builder
            .build_cartesian_2d(x0..x1, y0..y1)
            .map_err(render_err)?;

        if config.label_area_size > 0 {
            chart
                .configure_mesh()
                .disable_mesh()
                .x_desc(self.x_label().unwrap_or(""))
                .y_desc(self.y_label().unwrap_or(""))
                .x_label_formatter(&|x| format!("{x:.0}"))
                .y_label_formatter(&|y| format!("{y:.0}"))
                .axis_desc_style((font, config.label_font_size))
                .draw()
                .map_err(render_err)?;
        }

        if let Some(image) = self.image() {
            let range = self
                .colorbar()
                .map(|c| c.range)
                .or_else(|| image.value_range())
                .unwrap_or((0.0, 1.0));
            chart
                .draw_series(image_cells(image, range))
                .map_err(render_err)?;
        }

        chart
            .draw_series(self.patches().iter().map(|p| {
                let color = p.color.mix(p.alpha);
                let style = if p.filled {
                    color.filled()
                } else {
                    color.stroke_width(1)
                };
                Rectangle::new([(p.x, p.y), (p.x + p.width, p.y + p.height)], style)
            }))
            .map_err(render_err)?;

        chart
            .draw_series(
                self.markers()
                    .iter()
                    .map(|m| Circle::new((m.x, m.y), m.size, m.color.mix(m.alpha).filled())),
            )
            .map_err(render_err)?;

        if let Some(colorbar) = self.colorbar() {
            draw_colorbar(&bar_area, colorbar, config)?;
        }

        root.present().map_err(render_err)?;
        Ok(())
    }
}

fn image_cells(
    image: &ImageLayer,
    range: (f64, f64),
) -> impl Iterator<Item = Rectangle<(f64, f64)>> + '_ {
    image
        .data
        .indexed_iter()
        .filter(|(_, v)| !v.is_nan())
        .map(move |((row, column), &value)| {
            let (lower, upper) = image.cell_bounds(row, column);
            Rectangle::new([lower, upper], colormap(value, range).filled())
        })
}

fn draw_colorbar<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    colorbar: &Colorbar,
    config: &RenderConfig,
) -> Result<()> {
    let (width, height) = area.dim_in_pixel();
    let top = config.margin as i32 + 10;
    let bottom = config.margin as i32 + config.label_area_size as i32;
    let usable = height as i32 - top - bottom;
    if usable < 2 {
        return Ok(());
    }

    let strip_x = 10;
    let strip_width = 25;
    let (lo, hi) = colorbar.range;

    for i in 0..usable {
        let frac = 1.0 - i as f64 / (usable - 1) as f64;
        let color = ViridisRGB.get_color(frac);
        area.draw(&Rectangle::new(
            [(strip_x, top + i), (strip_x + strip_width, top + i + 1)],
            color.filled(),
        ))
        .map_err(render_err)?;
    }

    let font = (config.font_family.as_str(), config.label_font_size).into_font();
    let label_style = TextStyle::from(font.clone()).color(&BLACK);
    let ticks = 5;
    for i in 0..ticks {
        let frac = i as f64 / (ticks - 1) as f64;
        let value = hi - (hi - lo) * frac;
        let y = top + (frac * (usable - 1) as f64) as i32;
        area.draw_text(
            &format!("{value:.3e}"),
            &label_style,
            (strip_x + strip_width + 5, y - config.label_font_size as i32 / 2),
        )
        .map_err(render_err)?;
    }

    let desc_style = TextStyle::from(font)
        .color(&BLACK)
        .transform(FontTransform::Rotate270);
    area.draw_text(
        &colorbar.label,
        &desc_style,
        (width as i32 - config.label_font_size as i32 - 4, top + usable / 2),
    )
    .map_err(render_err)?;

    Ok(())
}
