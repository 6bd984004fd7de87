//! Discovery and ordering of per-time-step exit-data files.
//!
//! The upstream photon-transport simulation drops one data file per time step
//! into a single directory, alongside a seed file that is not data. This module
//! snapshots that directory into a [`FileCatalog`]: a time-ordered, filtered
//! list of candidate files. The catalog is built once and never re-scans; a
//! caller that wants fresh data rebuilds it.
//!
//! Ordering is ascending by modification time. The filesystem gives no stable
//! order for equal timestamps, so the filename serves as a deterministic
//! secondary key.

use crate::error::{PipelineError, PipelineResult};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// One eligible data file: its path and the modification time it is ordered by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Full path of the data file.
    pub path: PathBuf,
    /// Last-modification time, the time-step ordering key.
    pub modified_at: SystemTime,
}

/// A time-ordered snapshot of the eligible files in an input directory.
///
/// Invariants after construction: entries are sorted ascending by
/// `modified_at` (ties broken by filename); no entry is a directory or an
/// excluded name.
#[derive(Debug)]
pub struct FileCatalog {
    root: PathBuf,
    entries: Vec<FileEntry>,
}

impl FileCatalog {
    /// Scan `directory` non-recursively and build the ordered catalog.
    ///
    /// `excluded_names` are literal filenames (no globbing) that are never
    /// treated as time-step data, such as the upstream generator's seed file.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Configuration`] if `directory` does not exist or is
    ///   not a directory.
    /// - [`PipelineError::Io`] if the directory cannot be enumerated or an
    ///   entry's modification time cannot be read.
    pub fn build(directory: &Path, excluded_names: &[String]) -> PipelineResult<Self> {
        if !directory.is_dir() {
            return Err(PipelineError::Configuration(format!(
                "input directory '{}' does not exist or is not a directory",
                directory.display()
            )));
        }

        let mut entries = Vec::new();
        let read_dir =
            std::fs::read_dir(directory).map_err(|e| PipelineError::io(directory, e))?;
        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(|e| PipelineError::io(directory, e))?;
            let path = dir_entry.path();

            let file_type = dir_entry
                .file_type()
                .map_err(|e| PipelineError::io(&path, e))?;
            if file_type.is_dir() {
                continue;
            }
            let name = dir_entry.file_name();
            if excluded_names.iter().any(|ex| name == ex.as_str()) {
                debug!(file = %path.display(), "excluding non-data file");
                continue;
            }

            // An unreadable timestamp would silently break the time-step
            // ordering, so it is an error rather than a skip.
            let modified_at = dir_entry
                .metadata()
                .and_then(|m| m.modified())
                .map_err(|e| PipelineError::io(&path, e))?;

            entries.push(FileEntry { path, modified_at });
        }

        // Filename as the secondary key keeps equal-mtime runs deterministic
        // across platforms.
        entries.sort_by(|a, b| {
            a.modified_at
                .cmp(&b.modified_at)
                .then_with(|| a.path.file_name().cmp(&b.path.file_name()))
        });

        debug!(
            directory = %directory.display(),
            files = entries.len(),
            "built exit-data catalog"
        );

        Ok(Self {
            root: directory.to_path_buf(),
            entries,
        })
    }

    /// Directory this catalog was built from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of time steps (files) in the catalog.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog holds no eligible files.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry for time-step `index`, if in range.
    pub fn get(&self, index: usize) -> Option<&FileEntry> {
        self.entries.get(index)
    }

    /// Iterate the entries in time-step order.
    pub fn iter(&self) -> std::slice::Iter<'_, FileEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a FileCatalog {
    type Item = &'a FileEntry;
    type IntoIter = std::slice::Iter<'a, FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    fn touch_with_mtime(path: &Path, mtime: SystemTime) {
        let file = File::create(path).expect("create file");
        file.set_modified(mtime).expect("set mtime");
    }

    #[test]
    fn sorts_ascending_by_mtime() {
        let dir = tempfile::tempdir().expect("tempdir");
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        // Create in the opposite order of their timestamps.
        touch_with_mtime(&dir.path().join("newest.dat"), base + Duration::from_secs(30));
        touch_with_mtime(&dir.path().join("oldest.dat"), base);
        touch_with_mtime(&dir.path().join("middle.dat"), base + Duration::from_secs(10));

        let catalog = FileCatalog::build(dir.path(), &[]).expect("build");
        let names: Vec<_> = catalog
            .iter()
            .map(|e| e.path.file_name().and_then(|n| n.to_str()).map(String::from))
            .collect();
        assert_eq!(
            names,
            vec![
                Some("oldest.dat".to_string()),
                Some("middle.dat".to_string()),
                Some("newest.dat".to_string())
            ]
        );
    }

    #[test]
    fn equal_mtimes_break_ties_by_filename() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(2_000_000);
        touch_with_mtime(&dir.path().join("b.dat"), mtime);
        touch_with_mtime(&dir.path().join("a.dat"), mtime);
        touch_with_mtime(&dir.path().join("c.dat"), mtime);

        let catalog = FileCatalog::build(dir.path(), &[]).expect("build");
        let names: Vec<_> = catalog
            .iter()
            .filter_map(|e| e.path.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec!["a.dat", "b.dat", "c.dat"]);
    }

    #[test]
    fn excluded_name_never_appears() {
        let dir = tempfile::tempdir().expect("tempdir");
        File::create(dir.path().join("seeds_for_exit.dat")).expect("create");

        let catalog =
            FileCatalog::build(dir.path(), &["seeds_for_exit.dat".to_string()]).expect("build");
        assert!(catalog.is_empty());
        assert!(catalog.get(0).is_none());
    }

    #[test]
    fn subdirectories_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("speckles")).expect("mkdir");
        File::create(dir.path().join("t0.dat")).expect("create");

        let catalog = FileCatalog::build(dir.path(), &[]).expect("build");
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get(0).map(|e| e.path.ends_with("t0.dat")) == Some(true));
    }

    #[test]
    fn missing_directory_is_a_configuration_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope");
        let err = FileCatalog::build(&missing, &[]).expect_err("must fail");
        assert!(matches!(err, PipelineError::Configuration(_)));
    }
}
