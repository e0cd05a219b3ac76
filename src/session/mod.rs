//! CSRF session storage for the redirect workflow.
//!
//! One session slot, persisted as `{"csrf_token_session_key": "<token>"}`.
//! Clearing renames the live file to an expired artifact instead of deleting
//! it, so a missing session can be told apart from one that never existed.
//!
//! ```text
//! EMPTY --set--> LIVE --clear--> EXPIRED --set--> LIVE (EXPIRED kept alongside)
//! ```

use crate::files::{self, StoreError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;


/// Key under which the token is stored in the session file
pub const CSRF_SESSION_KEY: &str = "csrf_token_session_key";

#[derive(Serialize, Deserialize)]
struct SessionRecord {
    csrf_token_session_key: String,
}

/// Generate a fresh single-use CSRF token
pub fn generate_csrf_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// File-backed CSRF session slot
pub struct CsrfSessionStore {
    live_path: PathBuf,
    expired_path: PathBuf,
    lock: Mutex<()>,
}

impl CsrfSessionStore {
    pub fn new(live_path: impl Into<PathBuf>, expired_path: impl Into<PathBuf>) -> Self {
        Self {
            live_path: live_path.into(),
            expired_path: expired_path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn live_path(&self) -> &Path {
        &self.live_path
    }

    pub fn expired_path(&self) -> &Path {
        &self.expired_path
    }

    /// Arm the session with `token`, replacing any live value
    pub fn set(&self, token: &str) -> Result<(), StoreError> {
        let record = SessionRecord {
            csrf_token_session_key: token.to_string(),
        };

        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        files::write_json_atomic(&self.live_path, &record)?;

        debug!(path = %self.live_path.display(), "Saved CSRF session");
        Ok(())
    }

    /// The live token, or `None` when there is no usable session.
    ///
    /// A missing or unparsable session file both mean "no active session".
    pub fn get(&self) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        match files::read_json::<SessionRecord>(&self.live_path) {
            Ok(record) => Some(record.csrf_token_session_key),
            Err(StoreError::NotFound(_)) => None,
            Err(e) => {
                debug!(error = %e, "Ignoring unreadable CSRF session");
                None
            }
        }
    }

    /// Expire the live session by renaming it to the expired path.
    ///
    /// Any previous expired artifact is removed first; if that fails the
    /// whole operation fails and the live session is left untouched.
    /// No-op when there is no live session.
    pub fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        if !self.live_path.is_file() {
            return Ok(());
        }

        files::remove_if_present(&self.expired_path)?;
        fs::rename(&self.live_path, &self.expired_path)
            .map_err(|e| StoreError::io("rename", &self.live_path, e))?;

        debug!(
            expired_path = %self.expired_path.display(),
            "Expired CSRF session"
        );
        Ok(())
    }

    /// Read and expire the live session in one step.
    ///
    /// The rename to the expired path is the commit point: of several
    /// callers (threads or processes) racing for the same session, exactly
    /// one sees `Some(token)`. An unparsable session is still expired and
    /// yields `None`.
    pub fn take(&self) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        if !self.live_path.is_file() {
            return Ok(None);
        }

        files::remove_if_present(&self.expired_path)?;
        match fs::rename(&self.live_path, &self.expired_path) {
            Ok(()) => {}
            // Another process won the race
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io("rename", &self.live_path, e)),
        }
        debug!(
            expired_path = %self.expired_path.display(),
            "Took and expired CSRF session"
        );

        match files::read_json::<SessionRecord>(&self.expired_path) {
            Ok(record) => Ok(Some(record.csrf_token_session_key)),
            Err(e) => {
                debug!(error = %e, "Expired an unreadable CSRF session");
                Ok(None)
            }
        }
    }

    /// Remove both the live and the expired session files
    pub fn delete_files(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        for path in [&self.live_path, &self.expired_path] {
            if files::remove_if_present(path)? {
                info!(path = %path.display(), "Deleted session file");
            }
        }
        Ok(())
    }
}
