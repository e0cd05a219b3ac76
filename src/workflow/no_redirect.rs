use super::{credential_from_grant, WorkflowError, WorkflowResult};
use crate::credentials::{AccessCredential, CredentialStore};
use crate::provider::AuthorizationProvider;
use crate::remote::{self, RemoteStorage};
use std::sync::Arc;
use tracing::{debug, info, warn};

const SAVE_NOTE: &str = "saved by the no-redirect workflow";

/// No-redirect flow: the user relays the authorization code by hand, so
/// there is no callback leg and no CSRF session.
pub struct NoRedirectWorkflow {
    provider: Arc<dyn AuthorizationProvider>,
    credentials: Arc<CredentialStore>,
    remote: Option<Arc<dyn RemoteStorage>>,
}

impl NoRedirectWorkflow {
    pub fn new(
        provider: Arc<dyn AuthorizationProvider>,
        credentials: Arc<CredentialStore>,
    ) -> Self {
        Self {
            provider,
            credentials,
            remote: None,
        }
    }

    /// Populate sample content through `remote` after each successful authorization
    pub fn with_remote_storage(mut self, remote: Arc<dyn RemoteStorage>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Returns a 301 result pointing at the provider-hosted authorization page.
    pub fn start(&self) -> WorkflowResult {
        debug!("Starting authorization (no-redirect mode)");
        let url = self.provider.start_no_redirect();
        info!("Authorization start successful, got authorization URL");
        debug!(url = %url, "Authorization URL");
        WorkflowResult::redirect(url)
    }

    /// Exchange the pasted `security_code`, persist the credential, then
    /// populate sample remote content.
    ///
    /// Nothing is written when the provider rejects the code.
    pub async fn finish_and_save(
        &self,
        security_code: &str,
    ) -> Result<AccessCredential, WorkflowError> {
        info!("Finishing authorization (no-redirect mode)");

        let grant = self.provider.finish_no_redirect(security_code).await?;
        info!(owner_id = %grant.owner_id, "Authorization finish successful");

        let credential = self
            .credentials
            .save(&credential_from_grant(grant, SAVE_NOTE))?;

        if let Some(remote) = &self.remote {
            if let Err(e) = remote::populate_sample_content(remote.as_ref(), &credential).await {
                warn!(error = %e, "Failed to populate sample remote content");
            }
        }

        Ok(credential)
    }
}
