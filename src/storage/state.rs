//! Per-resource State Store

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{check_writable, read_json, write_json_atomic, StoreError};
use crate::models::{Resource, ResourceState};

/// Durable mapping from resource to its last known digest and entities.
///
/// Entries for resources no longer tracked are kept. Saving is skipped when
/// nothing changed since the last successful save, so an idle cycle leaves
/// the file untouched.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    entries: BTreeMap<Resource, ResourceState>,
    dirty: bool,
}

impl StateStore {
    /// Load the store and confirm it can be written back
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let store = Self::load(path)?;
        check_writable(path)?;
        Ok(store)
    }

    /// Load the store read-only; a missing file is an empty store
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let entries = read_json(path)?.unwrap_or_default();
        let dirty = !path.exists();
        Ok(Self {
            path: path.to_path_buf(),
            entries,
            dirty,
        })
    }

    /// Empty in-memory store bound to `path`
    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            entries: BTreeMap::new(),
            dirty: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, resource: &Resource) -> Option<&ResourceState> {
        self.entries.get(resource)
    }

    /// Last known digest for `resource`
    pub fn digest(&self, resource: &Resource) -> Option<&str> {
        self.entries.get(resource).map(|s| s.digest.as_str())
    }

    pub fn update(&mut self, resource: Resource, state: ResourceState) {
        self.entries.insert(resource, state);
        self.dirty = true;
    }

    pub fn entries(&self) -> &BTreeMap<Resource, ResourceState> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when in-memory state has not been persisted yet
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Persist if needed. Returns whether the file was written.
    ///
    /// On failure the store stays dirty and the next call retries.
    pub fn save(&mut self) -> Result<bool, StoreError> {
        if !self.dirty {
            return Ok(false);
        }
        write_json_atomic(&self.path, &self.entries)?;
        self.dirty = false;
        tracing::debug!(path = %self.path.display(), entries = self.entries.len(), "State store saved");
        Ok(true)
    }
}
