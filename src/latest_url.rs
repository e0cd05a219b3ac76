//! Latest-URL artifact: the most recent URL requested of the callback
//! listener, overwritten per request. Test harnesses poll it to see whether
//! the browser reached the listener.

use crate::files::{self, StoreError};
use crate::wait::{self, WaitSchedule};
use std::fs;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct LatestUrlFile {
    path: PathBuf,
}

impl LatestUrlFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the artifact with `url` (one line)
    pub fn save(&self, url: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::io("create directory", parent, e))?;
        }
        fs::write(&self.path, format!("{url}\n"))
            .map_err(|e| StoreError::io("write", &self.path, e))?;
        debug!(url = %url, path = %self.path.display(), "Recorded latest URL");
        Ok(())
    }

    /// The recorded URL, or an empty string when nothing has been recorded
    pub fn load(&self) -> String {
        fs::read_to_string(&self.path)
            .map(|s| s.trim_end_matches('\n').to_string())
            .unwrap_or_default()
    }

    /// Delete the artifact so the next `load` returns an empty string
    pub fn clear(&self) -> Result<(), StoreError> {
        if files::remove_if_present(&self.path)? {
            debug!(path = %self.path.display(), "Deleted latest URL file");
        }
        Ok(())
    }

    /// Wait for the artifact to appear
    pub async fn wait_for(&self, schedule: WaitSchedule, cancel: &CancellationToken) -> bool {
        wait::wait_for_file(&self.path, schedule, cancel).await
    }
}
