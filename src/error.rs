//! Custom error types for the application.
//!
//! This module defines the primary error type, `PipelineError`, for the entire
//! pipeline. Using the `thiserror` crate, it provides a centralized and consistent
//! way to handle the failure modes of a time-step sweep, from configuration and
//! I/O issues to contract violations at the compute-stage boundary.
//!
//! ## Error Hierarchy
//!
//! - **`Config`**: Wraps errors from the `figment` configuration layer, typically
//!   file parsing or format issues.
//! - **`Configuration`**: Semantic errors in the configuration that pass parsing
//!   but are logically incorrect (e.g., an input path that is not a directory).
//! - **`Io`**: A `std::io::Error` annotated with the offending path, so every
//!   fatal diagnostic identifies the file or directory that failed.
//! - **`EmptyCatalog`**: No eligible exit-data files were found; there is no time
//!   step to process.
//! - **`TimestepOutOfRange`**: An index-based load beyond the catalog length.
//! - **`CapacityShortfall`**: The loaded table holds fewer records than the
//!   configured transfer capacity. The transfer rejects this before the compute
//!   stage is invoked; it is never an out-of-bounds read.
//! - **`ColumnContract`**: The inferred schema is narrower than the positional
//!   photon-field mapping requires.
//! - **`Compute`**: An opaque failure reported by the external compute stage.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias for results using the pipeline error type.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// The primary error type for the exit-data pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Configuration-layer parsing or merging failure.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Semantically invalid configuration value.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// I/O failure, annotated with the offending path.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        /// Path of the file or directory that failed.
        path: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// The input directory yielded no eligible exit-data files.
    #[error("no eligible exit-data files found in '{}'", .0.display())]
    EmptyCatalog(PathBuf),

    /// Index-based load past the end of the catalog.
    #[error("time step {index} out of range: catalog holds {len} files")]
    TimestepOutOfRange {
        /// Requested time-step index.
        index: usize,
        /// Number of files in the catalog.
        len: usize,
    },

    /// Fewer records available than the configured transfer capacity.
    #[error("capacity shortfall: table holds {have} records, transfer requires {need}")]
    CapacityShortfall {
        /// Records actually present in the loaded table.
        have: usize,
        /// Configured transfer capacity.
        need: usize,
    },

    /// Inferred schema narrower than the photon-field mapping.
    #[error("column contract violation: file has {have} columns, photon mapping requires {need}")]
    ColumnContract {
        /// Columns inferred from the file.
        have: usize,
        /// Columns the positional mapping reads.
        need: usize,
    },

    /// Failure reported by the external compute stage.
    #[error("compute stage failed: {0}")]
    Compute(String),
}

impl PipelineError {
    /// Annotate an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the `skip` I/O policy may recover from this error.
    ///
    /// Only per-file I/O failures qualify. Contract violations (capacity,
    /// columns) and configuration errors are always fatal. This is a
    /// necessary condition, not a sufficient one: the driver additionally
    /// restricts skipping to failures in its loading phase, so an I/O error
    /// while writing output still aborts the run.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

impl From<figment::Error> for PipelineError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}
