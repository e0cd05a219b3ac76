//! Single-record JSON files on local disk.
//!
//! Every store in this crate owns exactly one file and re-reads it on each
//! access, so the client process and the callback listener can cooperate
//! without sharing memory.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage-layer failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record file does not exist
    #[error("file {} not found", .0.display())]
    NotFound(PathBuf),

    /// The file exists but is not the expected structured record
    #[error("file {} is not a valid record: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A required field is empty
    #[error("record in {} has an empty {field}", .path.display())]
    Incomplete { path: PathBuf, field: &'static str },

    /// Write, rename or delete failed
    #[error("{action} {} failed: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Write `value` as pretty JSON (plus trailing newline) to `path`.
///
/// Writes to a `.tmp` sibling, fsyncs, then renames, so readers never see a
/// partially written record.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let mut json = serde_json::to_string_pretty(value).map_err(|e| StoreError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    json.push('\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StoreError::io("create directory", parent, e))?;
    }

    let tmp_path = tmp_path(path);
    {
        let mut file =
            File::create(&tmp_path).map_err(|e| StoreError::io("create", &tmp_path, e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| StoreError::io("write", &tmp_path, e))?;
        file.sync_all()
            .map_err(|e| StoreError::io("sync", &tmp_path, e))?;
    }

    fs::rename(&tmp_path, path).map_err(|e| StoreError::io("rename", &tmp_path, e))?;
    Ok(())
}

/// Read and deserialize a JSON record.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(StoreError::NotFound(path.to_path_buf()))
        }
        Err(e) => return Err(StoreError::io("read", path, e)),
    };

    serde_json::from_str(&contents).map_err(|e| StoreError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Remove `path`; a missing file is not an error. Returns whether a file was removed.
pub(crate) fn remove_if_present(path: &Path) -> Result<bool, StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StoreError::io("remove", path, e)),
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
