//! FishNet - Illegal Fishing Detection Pipeline
//!
//! Batch driver: load AIS records and reference data, run the analysis
//! pipeline, write the canonical JSON result files.
//!
//! # Usage
//!
//! ```bash
//! # Fast analysis (no proximity index, synthetic context)
//! fishnet --ais data/AIS_2024_01_01.csv --out-dir results --fast
//!
//! # Complete analysis with checkpointed proximity index
//! fishnet --ais data/AIS_2024_01_01.csv \
//!         --fleet-dir data/fleets --mpa data/WDPA_marine.csv \
//!         --out-dir results --full
//! ```
//!
//! # Environment Variables
//!
//! - `FISHNET_CONFIG`: path to a TOML config file (see `PipelineConfig`)
//! - `RUST_LOG`: logging level (default: info)

use anyhow::{bail, Context, Result};
use clap::Parser;
use fishnet::{
    load_ais_csv, load_fleet_dir, load_mpa_csv, CancelFlag, FixStore, MpaTable, PipelineConfig,
    PipelineInputs, PipelineOptions, RunMode,
};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "fishnet")]
#[command(about = "FishNet AIS dark-event detection pipeline")]
#[command(version)]
struct CliArgs {
    /// AIS position report CSV files (NOAA or Global Fishing Watch format).
    /// Repeatable; all files are merged into one batch.
    #[arg(long, required = true, num_args = 1..)]
    ais: Vec<PathBuf>,

    /// Directory holding the fishing fleet gear CSVs
    /// (drifting_longlines.csv, trawlers.csv, ...)
    #[arg(long)]
    fleet_dir: Option<PathBuf>,

    /// WDPA marine protected areas CSV
    #[arg(long)]
    mpa: Option<PathBuf>,

    /// Run the complete analysis including the proximity index (slow)
    #[arg(long, conflicts_with = "fast")]
    full: bool,

    /// Skip the proximity index and use synthetic context (default)
    #[arg(long)]
    fast: bool,

    /// Directory for the JSON result files
    #[arg(long, default_value = "results")]
    out_dir: PathBuf,

    /// Proximity checkpoint file (full mode). Defaults to
    /// `<out-dir>/proximity_checkpoint.json`.
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Override the dark-event gap threshold in minutes
    #[arg(long)]
    threshold_minutes: Option<f64>,
}

fn main() {
    // RUST_LOG overrides the default info level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run() {
        eprintln!("fishnet: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse();

    let mut config = PipelineConfig::load().context("loading configuration")?;
    if let Some(threshold) = args.threshold_minutes {
        config.detection.threshold_minutes = threshold;
    }
    config.validate().context("validating configuration")?;

    // C1: records and reference data
    let mut fixes = Vec::new();
    for path in &args.ais {
        let (mut loaded, report) = load_ais_csv(path)
            .with_context(|| format!("loading AIS records from {}", path.display()))?;
        info!(
            path = %path.display(),
            loaded = report.loaded,
            dropped = report.dropped,
            "AIS file loaded"
        );
        fixes.append(&mut loaded);
    }
    let store = FixStore::from_fixes(fixes);
    if store.is_empty() {
        bail!("no usable AIS records in the input set");
    }

    let fleet = match &args.fleet_dir {
        Some(dir) => load_fleet_dir(dir)
            .with_context(|| format!("loading fleet datasets from {}", dir.display()))?,
        None => {
            warn!("no --fleet-dir given; fleet enrichment will mark no fishing vessels");
            fishnet::FleetRegistry::new()
        }
    };

    let mpa = match &args.mpa {
        Some(path) if path.exists() => load_mpa_csv(path)
            .with_context(|| format!("loading MPA table from {}", path.display()))?,
        Some(path) => {
            warn!(path = %path.display(), "MPA table missing; in_mpa will always be false");
            MpaTable::default()
        }
        None => MpaTable::default(),
    };

    let mode = if args.full { RunMode::Full } else { RunMode::Fast };
    let checkpoint_path = match mode {
        RunMode::Full => Some(
            args.checkpoint
                .clone()
                .unwrap_or_else(|| args.out_dir.join("proximity_checkpoint.json")),
        ),
        RunMode::Fast => None,
    };
    if mode == RunMode::Full {
        std::fs::create_dir_all(&args.out_dir)
            .with_context(|| format!("creating output directory {}", args.out_dir.display()))?;
    }

    let inputs = PipelineInputs { store, fleet, mpa };
    let options = PipelineOptions { mode, checkpoint_path };
    let outputs = fishnet::run_pipeline(&inputs, &config, &options, &CancelFlag::new())
        .context("running pipeline")?;

    fishnet::write_outputs(&outputs, &args.out_dir)
        .with_context(|| format!("writing results to {}", args.out_dir.display()))?;

    info!(
        out_dir = %args.out_dir.display(),
        dark_events = outputs.enhanced_dark_events.len(),
        clusters = outputs.dark_zone_clusters.len(),
        communities = outputs.vessel_communities.len(),
        "all results written"
    );
    Ok(())
}
