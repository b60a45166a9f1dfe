//! dendrometer - measure a tree in a photo from pre-computed model outputs.
//!
//! Detector and segmenter outputs come from a replay file (see
//! `detect::backends::replay`); boxes can also be given directly with
//! `--person-box` / `--tree-box`. The measurement is printed as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use dendrometer::allometry::{AccuracyReport, CarbonEstimate};
use dendrometer::config::validate_reference_height;
use dendrometer::detect::ReplayFile;
use dendrometer::overlay::render_overlay;
use dendrometer::{
    AnalyzerConfig, BackendRegistry, BoundingBox, ImageFrame, MeasurementRequest,
    MeasurementResult, TreeAnalyzer,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Estimate tree height and DBH using a person of known height as reference"
)]
struct Args {
    /// Image to analyze (JPEG or PNG).
    image: PathBuf,

    /// Real-world height of the reference person in centimeters.
    #[arg(long)]
    person_height: Option<f64>,

    /// Reference box override: x1,y1,x2,y2 in pixels.
    #[arg(long)]
    person_box: Option<BoundingBox>,

    /// Tree box override: x1,y1,x2,y2 in pixels.
    #[arg(long)]
    tree_box: Option<BoundingBox>,

    /// JSON file with detector and segmenter outputs for the image.
    #[arg(long, env = "DENDRO_REPLAY")]
    replay: Option<PathBuf>,

    /// Analyzer config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "DENDRO_CONFIG")]
    config: Option<PathBuf>,

    /// Write an annotated PNG of the measurement.
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Include biomass and CO2 estimates in the output.
    #[arg(long)]
    carbon: bool,

    /// Field-measured tree height in meters, for an accuracy report.
    #[arg(long, requires = "actual_circumference")]
    actual_height: Option<f64>,

    /// Tape circumference at breast height in centimeters, for an accuracy report.
    #[arg(long, requires = "actual_height")]
    actual_circumference: Option<f64>,
}

#[derive(Serialize)]
struct Output<'a> {
    #[serde(flatten)]
    result: &'a MeasurementResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    carbon: Option<CarbonEstimate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    accuracy: Option<AccuracyReport>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = AnalyzerConfig::load_with_path(args.config.as_deref())?;
    if let Some(height) = args.person_height {
        validate_reference_height(height)?;
    }

    let mut registry = BackendRegistry::new();
    match args.replay.as_deref() {
        Some(path) => {
            ReplayFile::load(path)?.register_into(&mut registry)?;
            log::info!("replaying model outputs from {}", path.display());
        }
        None => log::warn!("no replay file given; only box overrides will be used"),
    }
    registry.warm_up().context("failed to warm up backends")?;
    let breast_height_cm = config.trunk.breast_height_cm;
    let analyzer = TreeAnalyzer::new(Arc::new(registry), config);

    let bytes = std::fs::read(&args.image)
        .with_context(|| format!("failed to read image {}", args.image.display()))?;
    let frame = ImageFrame::decode(&bytes)
        .with_context(|| format!("failed to decode image {}", args.image.display()))?;

    let request = MeasurementRequest {
        reference_height_cm: args.person_height,
        person_box: args.person_box,
        tree_box: args.tree_box,
    };
    let result = analyzer.analyze_frame(&frame, &request);

    if let Some(path) = args.overlay.as_deref() {
        let reference_height_cm = args
            .person_height
            .unwrap_or(analyzer.config().reference_height_cm);
        render_overlay(&frame, &result, reference_height_cm, breast_height_cm)
            .save(path)
            .with_context(|| format!("failed to write overlay {}", path.display()))?;
        log::info!("overlay written to {}", path.display());
    }

    let carbon = if args.carbon {
        CarbonEstimate::from_measurement(&result)
    } else {
        None
    };
    let accuracy = match (args.actual_height, args.actual_circumference) {
        (Some(height_m), Some(circumference_cm)) => {
            Some(AccuracyReport::compare(&result, height_m, circumference_cm))
        }
        _ => None,
    };
    let output = Output {
        result: &result,
        carbon,
        accuracy,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
