//! Durable storage for the access credential produced by an authorization handshake.
//!
//! Exactly one credential record exists at a time; saving overwrites it.
//! The record is a human-inspectable JSON file:
//!
//! ```text
//! {
//!   "access_token": "sl.B0a...",
//!   "user_id": "12345678",
//!   "message": "saved by the redirect workflow",
//!   "creation_time": "Thursday 15 October 2026 14:03:07 UTC"
//! }
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use authflow::credentials::{AccessCredential, CredentialStore};
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = CredentialStore::new("files/access_token.json");
//!
//! let saved = store.save(&AccessCredential::new("token", "user-1", "demo"))?;
//! println!("saved at {:?}", saved.created_at);
//!
//! if store.exists() {
//!     let credential = store.load()?;
//!     println!("owner: {}", credential.owner_id);
//! }
//!
//! store.delete()?;
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

mod storage;

pub use storage::CredentialStore;

/// Access credential returned by a successful authorization exchange.
///
/// `created_at` is stamped by [`CredentialStore::save`], never by the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCredential {
    /// OAuth access token used for remote storage calls
    #[serde(rename = "access_token")]
    pub token: String,

    /// Provider account id of the authorizing user
    #[serde(rename = "user_id")]
    pub owner_id: String,

    /// Free-form note saved alongside the token
    #[serde(rename = "message", default)]
    pub note: String,

    /// When the record was persisted
    #[serde(rename = "creation_time", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl AccessCredential {
    pub fn new(
        token: impl Into<String>,
        owner_id: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            owner_id: owner_id.into(),
            note: note.into(),
            created_at: None,
        }
    }
}
