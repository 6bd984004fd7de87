//! Time-step sweep orchestration.
//!
//! [`TimestepDriver`] walks the catalog's ordered file list once, strictly
//! sequentially: load a time step's exit data, pack the transfer buffer,
//! dispatch the compute stage, persist its image, then move on. Nothing
//! overlaps; the compute call is the one genuine blocking step.
//!
//! # Phase machine
//!
//! ```text
//! Idle ──> Loading ──> Transferring ──> Computing ──> Writing ──┐
//!            ▲                                                  │
//!            └────────────── next time step ◄───────────────────┘
//!                                                          └──> Done
//! ```
//!
//! Failures are fatal by default: the sweep stops and the error propagates.
//! Under [`IoErrorPolicy::Skip`], a time step whose file fails to load is
//! logged and skipped; contract violations (capacity, columns) and failures
//! while writing output always abort.

use crate::catalog::FileCatalog;
use crate::compute::{ComputeStage, SpeckleImage, TransferBuffer};
use crate::config::{DetectorConfig, IoErrorPolicy, OutputConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::store::ExitDataStore;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Current phase of the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepPhase {
    /// No sweep in progress.
    Idle,
    /// Reading a time step's exit data into the record table.
    Loading,
    /// Packing records into the transfer buffer.
    Transferring,
    /// Blocked on the external compute stage.
    Computing,
    /// Persisting the returned image.
    Writing,
    /// Sweep finished; every catalog entry was visited.
    Done,
}

impl std::fmt::Display for SweepPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SweepPhase::Idle => write!(f, "Idle"),
            SweepPhase::Loading => write!(f, "Loading"),
            SweepPhase::Transferring => write!(f, "Transferring"),
            SweepPhase::Computing => write!(f, "Computing"),
            SweepPhase::Writing => write!(f, "Writing"),
            SweepPhase::Done => write!(f, "Done"),
        }
    }
}

/// Result of a completed sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    /// Time steps fully processed (computed and written).
    pub steps_completed: usize,
    /// Time steps skipped under [`IoErrorPolicy::Skip`].
    pub steps_skipped: usize,
    /// Total short rows encountered across all loads.
    pub truncated_rows: usize,
}

/// Drives one full pass over the catalog, one time step at a time.
pub struct TimestepDriver<'a> {
    catalog: &'a FileCatalog,
    store: ExitDataStore<'a>,
    buffer: TransferBuffer,
    stage: &'a dyn ComputeStage,
    detector: DetectorConfig,
    output: OutputConfig,
    on_io_error: IoErrorPolicy,
    phase: SweepPhase,
}

impl<'a> TimestepDriver<'a> {
    /// Assemble a driver over `catalog`, dispatching to `stage`.
    ///
    /// `max_photons` fixes the transfer-buffer capacity; it also sizes the
    /// record table's initial allocation.
    pub fn new(
        catalog: &'a FileCatalog,
        stage: &'a dyn ComputeStage,
        detector: DetectorConfig,
        output: OutputConfig,
        max_photons: usize,
        on_io_error: IoErrorPolicy,
    ) -> Self {
        Self {
            catalog,
            store: ExitDataStore::new(catalog, max_photons),
            buffer: TransferBuffer::new(max_photons),
            stage,
            detector,
            output,
            on_io_error,
            phase: SweepPhase::Idle,
        }
    }

    /// The phase the driver is currently in.
    pub fn phase(&self) -> SweepPhase {
        self.phase
    }

    /// Process every catalog entry in time-stamp order.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Configuration`] if the output directory is missing
    ///   (it is never created here).
    /// - [`PipelineError::EmptyCatalog`] if there is no time step to process.
    /// - Any per-step failure, unless it is a load I/O error and the policy
    ///   is [`IoErrorPolicy::Skip`].
    pub fn run(&mut self) -> PipelineResult<SweepSummary> {
        if !self.output.dir.is_dir() {
            return Err(PipelineError::Configuration(format!(
                "output directory '{}' does not exist or is not a directory",
                self.output.dir.display()
            )));
        }
        if self.catalog.is_empty() {
            return Err(PipelineError::EmptyCatalog(self.catalog.root().to_path_buf()));
        }

        info!(
            time_steps = self.catalog.len(),
            capacity = self.buffer.capacity(),
            stage = self.stage.name(),
            "starting time-step sweep"
        );

        let mut summary = SweepSummary {
            steps_completed: 0,
            steps_skipped: 0,
            truncated_rows: 0,
        };
        for index in 0..self.catalog.len() {
            match self.run_step(index, &mut summary) {
                Ok(()) => summary.steps_completed += 1,
                // The phase records where the step failed: only load failures
                // are skippable. An I/O error while writing the image must
                // abort, or the run would report success with output missing.
                Err(err)
                    if self.phase == SweepPhase::Loading
                        && err.is_skippable()
                        && self.on_io_error == IoErrorPolicy::Skip =>
                {
                    warn!(time_step = index, error = %err, "skipping time step");
                    summary.steps_skipped += 1;
                }
                Err(err) => {
                    self.phase = SweepPhase::Idle;
                    return Err(err);
                }
            }
        }
        self.phase = SweepPhase::Done;

        info!(
            completed = summary.steps_completed,
            skipped = summary.steps_skipped,
            truncated_rows = summary.truncated_rows,
            "sweep complete"
        );
        Ok(summary)
    }

    fn run_step(&mut self, index: usize, summary: &mut SweepSummary) -> PipelineResult<()> {
        self.phase = SweepPhase::Loading;
        let table = self.store.load_index(index)?;
        summary.truncated_rows += table.truncated_rows();

        self.phase = SweepPhase::Transferring;
        self.buffer.fill_from(table)?;

        self.phase = SweepPhase::Computing;
        let image = self.stage.form_image(&self.buffer, &self.detector)?;

        self.phase = SweepPhase::Writing;
        let path = self.output_path(index);
        write_image(&path, &image, self.output.precision)?;
        info!(time_step = index, output = %path.display(), "time step written");
        Ok(())
    }

    fn output_path(&self, index: usize) -> PathBuf {
        self.output.dir.join(format!("speckle_t{index}.dat"))
    }
}

/// Serialize `image` to `path`: one line per x-row, tab-separated scientific
/// notation with `precision` fractional digits, flushed after every row so a
/// crash loses at most one line.
///
/// Keeping `precision` fractional digits bounds the re-parse error below
/// `10^-precision` relative, which is the contract the output format promises.
pub fn write_image(path: &Path, image: &SpeckleImage, precision: usize) -> PipelineResult<()> {
    let mut file = File::create(path).map_err(|e| PipelineError::io(path, e))?;
    for row in image.rows() {
        let mut line = String::with_capacity(row.len() * (precision + 8));
        for value in row {
            line.push_str(&format!("{value:.precision$e}"));
            line.push('\t');
        }
        line.push('\n');
        file.write_all(line.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| PipelineError::io(path, e))?;
    }
    Ok(())
}
