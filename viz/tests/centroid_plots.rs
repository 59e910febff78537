//! End-to-end centroid plots on synthetic pixel files.

use ndarray::Array2;
use plotters::style::IntoFont;
use shared::pixel_file::synthetic::{SyntheticPixelFile, SyntheticStar, TransitHost};
use shared::pixel_file::PixelFile;
use shared::TransitEphemeris;
use viz::centroid::{compute_difference_image, difference_image, median_image};
use viz::render::RenderConfig;

fn ephemeris() -> TransitEphemeris {
    TransitEphemeris::new(1.3, 3.1, 0.3).unwrap()
}

fn scene(host: TransitHost) -> SyntheticPixelFile {
    SyntheticPixelFile {
        noise_sigma: 2.0,
        transit: Some(ephemeris()),
        depth: 0.05,
        host,
        contaminant: Some(SyntheticStar {
            column: 8.0,
            row: 2.0,
            flux: 10_000.0,
        }),
        ..Default::default()
    }
}

/// `(row, column)` of the smallest finite value.
fn argmin(image: &Array2<f64>) -> (usize, usize) {
    image
        .indexed_iter()
        .filter(|(_, v)| v.is_finite())
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(idx, _)| idx)
        .unwrap()
}

fn argmax(image: &Array2<f64>) -> (usize, usize) {
    image
        .indexed_iter()
        .filter(|(_, v)| v.is_finite())
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(idx, _)| idx)
        .unwrap()
}

#[test]
fn test_difference_image_localizes_target_transit() {
    let tpf = scene(TransitHost::Target).build().unwrap();
    let result = compute_difference_image(&tpf, &ephemeris()).unwrap();

    // 20 days of data with a 3.1 day period
    assert_eq!(result.epochs.len(), 6);
    assert_eq!(argmin(&result.image), (5, 5));
    assert!(result.image[[5, 5]] < -100.0);
}

#[test]
fn test_difference_image_localizes_contaminant_transit() {
    let tpf = scene(TransitHost::Contaminant).build().unwrap();
    let result = compute_difference_image(&tpf, &ephemeris()).unwrap();

    assert_eq!(argmin(&result.image), (2, 8));
    assert!(result.image[[5, 5]].abs() < 10.0);
}

#[test]
fn test_median_image_peaks_on_target() {
    let tpf = scene(TransitHost::Target).build().unwrap();
    let ax = median_image(&tpf, None).unwrap();

    let image = ax.image().unwrap();
    assert_eq!(argmax(&image.data), (5, 5));

    let geometry = tpf.geometry();
    assert_eq!(ax.x_limits(), geometry.x_limits());
    assert_eq!(ax.y_limits(), geometry.y_limits());

    let in_mask = tpf.pipeline_mask().iter().filter(|&&m| m).count();
    assert_eq!(ax.patches().len(), in_mask);
}

#[test]
fn test_difference_image_fails_outside_data_span() {
    let tpf = SyntheticPixelFile {
        cadences: 100,
        ..scene(TransitHost::Target)
    }
    .build()
    .unwrap();

    // The first predicted transit falls after the last cadence
    let late = TransitEphemeris::new(50.0, 100.0, 0.3).unwrap();
    assert!(difference_image(&tpf, &late, None).is_err());
}

/// Plot text needs a system font; headless machines may have none.
fn fonts_available(config: &RenderConfig) -> bool {
    (config.font_family.as_str(), 12.0)
        .into_font()
        .box_size("Flux")
        .is_ok()
}

#[test]
fn test_render_png_and_svg() {
    let config = RenderConfig::default();
    if !fonts_available(&config) {
        eprintln!("Skipping render test: no usable '{}' font", config.font_family);
        return;
    }

    let tpf = scene(TransitHost::Contaminant).build().unwrap();

    let mut ax = median_image(&tpf, None).unwrap();
    ax.set_title("Median Image");
    let png = test_helpers::output_path("centroid_median_image.png");
    ax.save(&png, &config).unwrap();

    let mut ax = difference_image(&tpf, &ephemeris(), None).unwrap();
    ax.set_title("Difference Image");
    let svg = test_helpers::output_path("centroid_difference_image.svg");
    ax.save(&svg, &config).unwrap();

    assert!(std::fs::metadata(&png).unwrap().len() > 0);
    let svg_text = std::fs::read_to_string(&svg).unwrap();
    assert!(svg_text.contains("<svg"));
}
