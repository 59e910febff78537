//! Render median and difference images for a synthetic transiting target.
//!
//! Builds a target pixel file with an injected box-shaped transit, either on
//! the target itself or on a nearby contaminating star, and writes the two
//! centroid vetting plots to the output directory. Moving the transit onto
//! the contaminant shows the difference image lighting up away from the
//! target marker.
//!
//! Usage:
//! ```
//! cargo run --bin centroid_plots -- --output-dir plots
//! cargo run --bin centroid_plots -- --contaminant 3,-2 --transit-on-contaminant
//! RUST_LOG=debug cargo run --bin centroid_plots -- --format svg --config render.json
//! ```

use clap::{Parser, ValueEnum};
use log::info;
use shared::pixel_file::synthetic::{SyntheticPixelFile, SyntheticStar, TransitHost};
use shared::pixel_file::PixelFile;
use shared::TransitEphemeris;
use std::path::PathBuf;
use viz::centroid::{compute_difference_image, difference_image, median_image};
use viz::render::RenderConfig;

/// Parse a cutout offset in format "columns,rows"
fn parse_offset(s: &str) -> Result<(f64, f64), String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 2 {
        return Err("Offset must be in format 'columns,rows'".to_string());
    }

    let columns = parts[0]
        .trim()
        .parse::<f64>()
        .map_err(|_| "Invalid column offset".to_string())?;
    let rows = parts[1]
        .trim()
        .parse::<f64>()
        .map_err(|_| "Invalid row offset".to_string())?;

    Ok((columns, rows))
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Png,
    Svg,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "centroid_plots")]
#[command(about = "Median and difference images for a synthetic transiting target")]
#[command(version)]
struct Args {
    /// Directory the plots are written to
    #[arg(short, long, default_value = "plots")]
    output_dir: PathBuf,

    /// Output image format
    #[arg(long, value_enum, default_value_t = OutputFormat::Png)]
    format: OutputFormat,

    /// JSON file with rendering options (size, fonts, colorbar width)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Mid-transit time of the reference transit (days)
    #[arg(long, default_value_t = 1.3)]
    epoch: f64,

    /// Orbital period (days)
    #[arg(long, default_value_t = 3.1)]
    period: f64,

    /// Transit duration (days)
    #[arg(long, default_value_t = 0.15)]
    duration: f64,

    /// Fractional transit depth of the host star
    #[arg(long, default_value_t = 0.02)]
    depth: f64,

    /// Number of cadences (2-minute spacing)
    #[arg(long, default_value_t = 10_000)]
    cadences: usize,

    /// Per-sample Gaussian noise (e-/s)
    #[arg(long, default_value_t = 5.0)]
    noise: f64,

    /// Contaminating star offset from the target (format: "columns,rows")
    #[arg(long, value_parser = parse_offset)]
    contaminant: Option<(f64, f64)>,

    /// Flux of the contaminating star (e-/s)
    #[arg(long, default_value_t = 8_000.0)]
    contaminant_flux: f64,

    /// Put the transit on the contaminant instead of the target
    #[arg(long, default_value_t = false)]
    transit_on_contaminant: bool,

    /// Random seed for the noise
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let render_config = match &args.config {
        Some(path) => RenderConfig::load_from_file(path)?,
        None => RenderConfig::default(),
    };

    let ephemeris = TransitEphemeris::new(args.epoch, args.period, args.duration)?;
    let base = SyntheticPixelFile::default();

    let contaminant = args.contaminant.map(|(dc, dr)| SyntheticStar {
        column: base.target.column + dc,
        row: base.target.row + dr,
        flux: args.contaminant_flux,
    });
    let host = if args.transit_on_contaminant && contaminant.is_some() {
        TransitHost::Contaminant
    } else {
        TransitHost::Target
    };

    let tpf = SyntheticPixelFile {
        cadences: args.cadences,
        cadence: 2.0 / (24.0 * 60.0),
        noise_sigma: args.noise,
        contaminant,
        transit: Some(ephemeris),
        depth: args.depth,
        host,
        seed: args.seed,
        ..base
    }
    .build()?;

    info!(
        "Synthetic pixel file: {} with {} cadences, transit on {:?}",
        tpf.geometry(),
        args.cadences,
        host
    );

    let difference = compute_difference_image(&tpf, &ephemeris)?;
    for epoch in &difference.epochs {
        println!(
            "Epoch at t={:.4} d: {} in-transit / {} out-of-transit frames",
            epoch.peak_time, epoch.in_frames, epoch.out_frames
        );
    }

    let ext = args.format.extension();

    let median_path = args.output_dir.join(format!("median_image.{ext}"));
    let mut ax = median_image(&tpf, None)?;
    ax.set_title("Median Image");
    ax.save(&median_path, &render_config)?;
    println!("Median image saved to: {}", median_path.display());

    let difference_path = args.output_dir.join(format!("difference_image.{ext}"));
    let mut ax = difference_image(&tpf, &ephemeris, None)?;
    ax.set_title("In-Transit minus Out-of-Transit");
    ax.save(&difference_path, &render_config)?;
    println!("Difference image saved to: {}", difference_path.display());

    Ok(())
}
