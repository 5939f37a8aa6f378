//! Append-only Change Log

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use super::{check_writable, read_json, write_json_atomic, StoreError};
use crate::models::ChangeLogEntry;

/// Ordered history of change and error events.
///
/// Entries appended since the last successful save are counted as pending;
/// a failed save keeps them in memory so the next save writes them too.
#[derive(Debug, Clone)]
pub struct ChangeLog {
    path: PathBuf,
    entries: Vec<ChangeLogEntry>,
    pending: usize,
}

impl ChangeLog {
    /// Load the log and confirm it can be written back
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let log = Self::load(path)?;
        check_writable(path)?;
        Ok(log)
    }

    /// Load the log; a missing file is an empty log
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            path: path.to_path_buf(),
            entries: read_entries(path)?,
            pending: 0,
        })
    }

    /// Empty in-memory log bound to `path`
    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            entries: Vec::new(),
            pending: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, entry: ChangeLogEntry) {
        self.entries.push(entry);
        self.pending += 1;
    }

    pub fn entries(&self) -> &[ChangeLogEntry] {
        &self.entries
    }

    /// Entries recorded at or after `cutoff`
    pub fn since(&self, cutoff: DateTime<Utc>) -> impl Iterator<Item = &ChangeLogEntry> {
        self.entries.iter().filter(move |e| e.timestamp >= cutoff)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries not yet persisted
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Persist the whole log if anything was appended. Returns whether the
    /// file was written.
    pub fn save(&mut self) -> Result<bool, StoreError> {
        if self.pending == 0 && self.path.exists() {
            return Ok(false);
        }
        write_json_atomic(&self.path, &self.entries)?;
        tracing::debug!(
            path = %self.path.display(),
            appended = self.pending,
            total = self.entries.len(),
            "Change log saved"
        );
        self.pending = 0;
        Ok(true)
    }
}

/// Read the log file without taking ownership of it
pub fn read_entries(path: &Path) -> Result<Vec<ChangeLogEntry>, StoreError> {
    Ok(read_json(path)?.unwrap_or_default())
}
