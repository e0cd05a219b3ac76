//! Remote storage reached with a freshly issued credential.
//!
//! Only the capability is defined here; the workflows use it once, after a
//! successful authorization, to populate sample content in the app folder.

use crate::clock;
use crate::credentials::AccessCredential;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

/// Account information file uploaded after authorization
pub const ACCOUNT_INFO_FILE: &str = "/account_info.rust.txt";

/// Folder recreated after authorization
pub const REVIEW_DIRECTORY: &str = "/oauth_session_rust";

/// Review note uploaded into [`REVIEW_DIRECTORY`]
pub const REVIEW_FILE: &str = "/oauth_session_rust/oauth_session_review.rust.md";

/// Entry in a remote folder listing
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirEntry {
    Folder {
        name: String,
    },
    File {
        name: String,
        size: u64,
        modified_at: String,
    },
}

impl DirEntry {
    pub fn name(&self) -> &str {
        match self {
            DirEntry::Folder { name } | DirEntry::File { name, .. } => name,
        }
    }
}

/// Remote storage interface used after authorization.
///
/// Implementations are bound to a credential when constructed, so none of
/// the methods take a token.
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// Upload `contents` to `path`, overwriting any existing file
    async fn upload_file(&self, path: &str, contents: Vec<u8>) -> Result<()>;

    async fn create_folder(&self, path: &str) -> Result<()>;

    /// Delete a file or folder; deleting a missing path is an error
    async fn delete(&self, path: &str) -> Result<()>;

    /// Account details as (name, value) pairs
    async fn account_info(&self) -> Result<Vec<(String, String)>>;

    async fn list_folder(&self, path: &str) -> Result<Vec<DirEntry>>;
}

/// Create the sample files and folder in the app folder.
///
/// Returns the review folder listing as read back after the uploads.
pub async fn populate_sample_content(
    storage: &dyn RemoteStorage,
    credential: &AccessCredential,
) -> Result<Vec<DirEntry>> {
    let mut account = format!("ACCOUNT INFORMATION FOR USER {}\n", credential.owner_id);
    for (name, value) in storage
        .account_info()
        .await
        .context("Failed to fetch account info")?
    {
        account.push_str(&format!("{name} = {value}\n"));
    }
    storage
        .upload_file(ACCOUNT_INFO_FILE, account.into_bytes())
        .await
        .context("Failed to upload account info file")?;
    info!(path = ACCOUNT_INFO_FILE, "Uploaded account info file");

    // Start each session with an empty review folder
    if let Err(e) = storage.delete(REVIEW_DIRECTORY).await {
        debug!(path = REVIEW_DIRECTORY, error = %e, "Review folder not deleted");
    }
    storage
        .create_folder(REVIEW_DIRECTORY)
        .await
        .context("Failed to create review folder")?;
    info!(path = REVIEW_DIRECTORY, "Created review folder");

    let review = format!(
        "# OAuth session review\n\nAuthorized as `{}` on {}.\n",
        credential.owner_id,
        clock::time_now()
    );
    storage
        .upload_file(REVIEW_FILE, review.into_bytes())
        .await
        .context("Failed to upload review file")?;
    info!(path = REVIEW_FILE, "Uploaded review file");

    let entries = storage
        .list_folder(REVIEW_DIRECTORY)
        .await
        .context("Failed to list review folder")?;
    let names: Vec<&str> = entries.iter().map(DirEntry::name).collect();
    info!(path = REVIEW_DIRECTORY, entries = ?names, "Review folder contents");

    Ok(entries)
}
