//! Durable JSON persistence for the State Store and Change Log
//!
//! Both files are rewritten whole on every save: the new contents go to
//! `{file}.tmp` first and are then renamed over the target, so a concurrent
//! reader sees either the old or the new file and never a truncated one.

pub mod changelog;
pub mod state;

pub use changelog::ChangeLog;
pub use state::StateStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Persistence errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt data in {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. } | Self::Corrupt { path, .. } | Self::Serialize { path, .. } => {
                path
            }
        }
    }
}

/// Path of the temporary file used while saving `path`
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn ensure_parent(path: &Path) -> Result<(), StoreError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))
        }
        _ => Ok(()),
    }
}

/// Write `bytes` to `path` via write-temp-then-rename
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    ensure_parent(path)?;
    let tmp = temp_path(path);

    let result = (|| {
        let file = File::create(&tmp).map_err(|e| StoreError::io(&tmp, e))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes).map_err(|e| StoreError::io(&tmp, e))?;
        writer.flush().map_err(|e| StoreError::io(&tmp, e))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Serialize `value` as pretty JSON and write it atomically
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, &bytes)
}

/// Read JSON from `path`; a missing file yields `None`
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    serde_json::from_reader(BufReader::new(file))
        .map(Some)
        .map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

/// Confirm that `path` can be written, without changing its contents
pub fn check_writable(path: &Path) -> Result<(), StoreError> {
    if path.exists() {
        return fs::OpenOptions::new()
            .append(true)
            .open(path)
            .map(drop)
            .map_err(|e| StoreError::io(path, e));
    }

    ensure_parent(path)?;
    let tmp = temp_path(path);
    File::create(&tmp).map_err(|e| StoreError::io(&tmp, e))?;
    fs::remove_file(&tmp).map_err(|e| StoreError::io(&tmp, e))
}
