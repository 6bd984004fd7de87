//! CLI entry point for speckle-pipeline.
//!
//! Provides a command-line interface for:
//! - Running a full time-step sweep over an exit-data directory
//! - Listing the discovered, time-ordered data files without processing them
//!
//! # Usage
//!
//! Run a sweep:
//! ```bash
//! speckle-pipeline run --input-dir data --output-dir data/speckles
//! ```
//!
//! Inspect the catalog order:
//! ```bash
//! speckle-pipeline catalog --input-dir data
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use speckle_pipeline::compute::CpuSpeckleStage;
use speckle_pipeline::config::{IoErrorPolicy, PipelineConfig};
use speckle_pipeline::store::ExitDataStore;
use speckle_pipeline::{telemetry, FileCatalog, TimestepDriver};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "speckle-pipeline")]
#[command(about = "Time-step sweep over Monte-Carlo exit-photon data", long_about = None)]
struct Cli {
    /// Optional TOML configuration file; CLI flags override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every time step: load, transfer, compute, write
    Run {
        /// Directory holding one exit-data file per time step
        #[arg(long)]
        input_dir: Option<PathBuf>,

        /// Existing directory the speckle images are written into
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Transfer-buffer capacity (records per time step)
        #[arg(long)]
        max_photons: Option<usize>,

        /// Fractional digits per written image value
        #[arg(long)]
        precision: Option<usize>,

        /// Skip a time step whose file fails to load instead of aborting
        #[arg(long)]
        skip_io_errors: bool,
    },

    /// List the discovered data files in time-step order
    Catalog {
        /// Directory holding one exit-data file per time step
        #[arg(long)]
        input_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = PipelineConfig::load(cli.config.as_deref())
        .context("failed to load pipeline configuration")?;
    telemetry::init(&config.log_level).map_err(|e| anyhow::anyhow!(e))?;

    match cli.command {
        Commands::Run {
            input_dir,
            output_dir,
            max_photons,
            precision,
            skip_io_errors,
        } => {
            if let Some(dir) = input_dir {
                config.input.dir = dir;
            }
            if let Some(dir) = output_dir {
                config.output.dir = dir;
            }
            if let Some(n) = max_photons {
                config.transfer.max_photons = n;
            }
            if let Some(p) = precision {
                config.output.precision = p;
            }
            if skip_io_errors {
                config.input.on_io_error = IoErrorPolicy::Skip;
            }
            run_sweep(&config)
        }
        Commands::Catalog { input_dir } => {
            if let Some(dir) = input_dir {
                config.input.dir = dir;
            }
            list_catalog(&config)
        }
    }
}

fn run_sweep(config: &PipelineConfig) -> Result<()> {
    config.validate()?;

    let catalog = FileCatalog::build(&config.input.dir, &config.input.excluded)?;
    let stage = CpuSpeckleStage::default();
    let mut driver = TimestepDriver::new(
        &catalog,
        &stage,
        config.detector.clone(),
        config.output.clone(),
        config.transfer.max_photons,
        config.input.on_io_error,
    );
    let summary = driver
        .run()
        .context("time-step sweep failed")?;

    println!(
        "Processed {} time step(s) ({} skipped, {} truncated row(s)) into {}",
        summary.steps_completed,
        summary.steps_skipped,
        summary.truncated_rows,
        config.output.dir.display()
    );
    Ok(())
}

fn list_catalog(config: &PipelineConfig) -> Result<()> {
    let catalog = FileCatalog::build(&config.input.dir, &config.input.excluded)?;
    println!(
        "{} exit-data file(s) in {}",
        catalog.len(),
        config.input.dir.display()
    );
    for (index, entry) in catalog.iter().enumerate() {
        let records = ExitDataStore::record_count_of(&entry.path)
            .with_context(|| format!("failed to count records of '{}'", entry.path.display()))?;
        println!("t{index}\t{}\t{} line(s)", entry.path.display(), records);
    }
    Ok(())
}
