//! Lazy per-time-step loading of exit data.
//!
//! [`ExitDataStore`] binds a [`FileCatalog`] to a single [`RecordTable`]: a
//! load by time-step index resolves the catalog entry and replaces the table
//! wholesale with that file's records. Only one file's data is ever resident,
//! and file handles are scoped to each operation, so the previous stream is
//! always released before a new one is opened.

use crate::catalog::FileCatalog;
use crate::error::{PipelineError, PipelineResult};
use crate::table::RecordTable;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

/// Owns the in-memory table for the currently loaded time step.
#[derive(Debug)]
pub struct ExitDataStore<'a> {
    catalog: &'a FileCatalog,
    table: RecordTable,
}

impl<'a> ExitDataStore<'a> {
    /// Create a store over `catalog`, pre-reserving `capacity_hint` rows.
    ///
    /// The hint typically comes from [`record_count_of`](Self::record_count_of)
    /// on the first catalog entry; it sizes the allocation and nothing else.
    pub fn new(catalog: &'a FileCatalog, capacity_hint: usize) -> Self {
        Self {
            catalog,
            table: RecordTable::with_capacity(capacity_hint),
        }
    }

    /// Count the newline-terminated lines of the file at `path`.
    ///
    /// A sizing hint only. It counts every line, including the schema-probe
    /// first line and any malformed tail, so it may legitimately disagree with
    /// the row count a subsequent [`load_path`](Self::load_path) produces.
    pub fn record_count_of(path: &Path) -> PipelineResult<usize> {
        let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
        let mut count = 0usize;
        for line in BufReader::new(file).lines() {
            line.map_err(|e| PipelineError::io(path, e))?;
            count += 1;
        }
        Ok(count)
    }

    /// Load the file for time-step `index`, as ordered by the catalog.
    ///
    /// # Errors
    ///
    /// [`PipelineError::TimestepOutOfRange`] if the catalog holds no entry at
    /// `index` (including the empty-catalog case); otherwise as
    /// [`load_path`](Self::load_path).
    pub fn load_index(&mut self, index: usize) -> PipelineResult<&RecordTable> {
        let entry = self
            .catalog
            .get(index)
            .ok_or(PipelineError::TimestepOutOfRange {
                index,
                len: self.catalog.len(),
            })?;
        let path = entry.path.clone();
        self.load_path(&path)
    }

    /// Load the file at `path`, replacing any previously loaded contents.
    ///
    /// After this returns, the table reflects exactly this one file; nothing
    /// accumulates across calls.
    pub fn load_path(&mut self, path: &Path) -> PipelineResult<&RecordTable> {
        let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
        self.table
            .load(BufReader::new(file))
            .map_err(|e| PipelineError::io(path, e))?;

        debug!(
            file = %path.display(),
            rows = self.table.row_count(),
            columns = self.table.column_count(),
            "loaded exit data"
        );
        if self.table.truncated_rows() > 0 {
            warn!(
                file = %path.display(),
                truncated = self.table.truncated_rows(),
                "short row in exit data; trailing fields zero-filled"
            );
        }
        Ok(&self.table)
    }

    /// The table for the most recently loaded time step.
    pub fn table(&self) -> &RecordTable {
        &self.table
    }
}
