//! File-backed credential storage.

use super::AccessCredential;
use crate::clock;
use crate::files::{self, StoreError};
use crate::wait::{self, WaitSchedule};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Single-slot credential store backed by one JSON file.
///
/// # Thread Safety
/// - Writes go through a temp file + rename, so a concurrent reader sees
///   either the old or the new record
/// - An internal mutex serializes save/delete within one process
pub struct CredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persists the credential, overwriting any existing record.
    ///
    /// Stamps `created_at` with the current time and returns the record as
    /// written.
    ///
    /// # Returns
    /// * `Ok(AccessCredential)` - The persisted record
    /// * `Err(StoreError::Incomplete)` - Token or owner id is empty
    /// * `Err(StoreError::Io)` - Write or rename failed
    pub fn save(&self, credential: &AccessCredential) -> Result<AccessCredential, StoreError> {
        self.check_complete(credential)?;

        let mut record = credential.clone();
        record.created_at = Some(clock::time_now());

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        files::write_json_atomic(&self.path, &record)?;

        debug!(path = %self.path.display(), "Saved access credential");
        Ok(record)
    }

    /// Reads the stored credential.
    ///
    /// # Returns
    /// * `Ok(AccessCredential)` - Record found and parsed
    /// * `Err(StoreError::NotFound)` - No credential file
    /// * `Err(StoreError::Parse)` - File is not a credential record
    /// * `Err(StoreError::Incomplete)` - Token or owner id missing
    pub fn load(&self) -> Result<AccessCredential, StoreError> {
        let credential: AccessCredential = files::read_json(&self.path)?;
        self.check_complete(&credential)?;

        debug!(
            path = %self.path.display(),
            owner_id = %credential.owner_id,
            "Loaded access credential"
        );
        Ok(credential)
    }

    /// Whether a credential file is present.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Removes the credential file; succeeds when it is already absent.
    pub fn delete(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if files::remove_if_present(&self.path)? {
            info!(path = %self.path.display(), "Deleted access credential");
        }
        Ok(())
    }

    /// Waits until a credential file appears (written by another process or task).
    ///
    /// Returns `false` only when `schedule.timeout` elapses or `cancel` fires.
    /// There is no other way to stop the wait short of process interruption.
    pub async fn wait_until_present(
        &self,
        schedule: WaitSchedule,
        cancel: &CancellationToken,
    ) -> bool {
        wait::wait_for_file(&self.path, schedule, cancel).await
    }

    fn check_complete(&self, credential: &AccessCredential) -> Result<(), StoreError> {
        let field = if credential.token.is_empty() {
            "access_token"
        } else if credential.owner_id.is_empty() {
            "user_id"
        } else {
            return Ok(());
        };
        Err(StoreError::Incomplete {
            path: self.path.clone(),
            field,
        })
    }
}
