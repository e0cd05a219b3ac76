use super::query::parse_query;
use super::{credential_from_grant, WorkflowError, WorkflowResult};
use crate::credentials::CredentialStore;
use crate::provider::dropbox::split_state;
use crate::provider::{AuthorizationProvider, ProviderError};
use crate::remote::{self, RemoteStorage};
use crate::session::{generate_csrf_token, CsrfSessionStore};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const SAVE_NOTE: &str = "saved by the redirect workflow";

const SUCCESS_BODY: &str = "<h1>Congratulations!</h1>\
    <p>The access token was created successfully.\
    <p>You may return to your client.";

/// How a redirect-flow callback ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishStatus {
    Success,
    /// Malformed callback query or exchange request
    BadRequest,
    CsrfMismatch,
    /// No session to check against, per the provider
    BadState,
    NotApproved,
    ProviderError,
    /// Local storage failed while finishing
    Fault,
}

impl FinishStatus {
    fn from_provider_error(err: &ProviderError) -> Self {
        match err {
            ProviderError::BadRequest(_) => FinishStatus::BadRequest,
            ProviderError::BadState(_) => FinishStatus::BadState,
            ProviderError::Csrf(_) => FinishStatus::CsrfMismatch,
            ProviderError::NotApproved(_) => FinishStatus::NotApproved,
            ProviderError::Provider(_) => FinishStatus::ProviderError,
        }
    }
}

/// Redirect flow coordinator.
///
/// `start` runs in the client process; `finish` runs in the callback
/// listener, possibly in another process. The two halves meet only through
/// the CSRF session file and the credential file.
pub struct RedirectWorkflow {
    provider: Arc<dyn AuthorizationProvider>,
    credentials: Arc<CredentialStore>,
    sessions: Arc<CsrfSessionStore>,
    remote: Option<Arc<dyn RemoteStorage>>,
    callback_url: String,
    restart_url: String,
}

impl RedirectWorkflow {
    /// # Arguments
    /// * `callback_url` - Finish endpoint of the callback listener, registered
    ///   with the provider
    /// * `restart_url` - Where the browser is sent to start over after a stale
    ///   state or declined consent
    pub fn new(
        provider: Arc<dyn AuthorizationProvider>,
        credentials: Arc<CredentialStore>,
        sessions: Arc<CsrfSessionStore>,
        callback_url: impl Into<String>,
        restart_url: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            credentials,
            sessions,
            remote: None,
            callback_url: callback_url.into(),
            restart_url: restart_url.into(),
        }
    }

    /// Populate sample content through `remote` after each successful authorization
    pub fn with_remote_storage(mut self, remote: Arc<dyn RemoteStorage>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    /// Whether a live CSRF session is waiting for its callback
    pub fn awaiting_callback(&self) -> bool {
        self.sessions.get().is_some()
    }

    /// Arm a fresh CSRF session and return a 301 result pointing at the
    /// provider-hosted authorization page.
    pub fn start(&self) -> Result<WorkflowResult, WorkflowError> {
        debug!("Starting authorization (redirect mode)");

        let csrf_token = generate_csrf_token();
        self.sessions.set(&csrf_token)?;
        let url = self.provider.start_redirect(&self.callback_url, &csrf_token);

        info!(url = %url, "Authorization start successful, awaiting callback");
        Ok(WorkflowResult::redirect(url))
    }

    /// Handle the provider's callback (`raw_query` is the URL query string).
    pub async fn finish(&self, raw_query: &str) -> WorkflowResult {
        self.finish_with_status(raw_query).await.1
    }

    /// Like [`finish`](Self::finish), also reporting how the flow ended.
    ///
    /// The session is single-use: it is taken (read and expired in one
    /// step) before any outcome is decided.
    pub async fn finish_with_status(&self, raw_query: &str) -> (FinishStatus, WorkflowResult) {
        debug!(query = %raw_query, "Finishing authorization (redirect mode)");

        let stored_token = match self.sessions.take() {
            Ok(token) => token,
            Err(e) => {
                error!(error = %e, "Failed to expire CSRF session");
                return self.outcome(FinishStatus::Fault);
            }
        };

        let query = match parse_query(raw_query) {
            Ok(query) => query,
            Err(e) => {
                warn!(error = %e, "Malformed callback query");
                return self.outcome(FinishStatus::BadRequest);
            }
        };

        let Some(state) = query.get("state") else {
            warn!("Callback is missing the state parameter");
            return self.outcome(FinishStatus::BadRequest);
        };
        let (echoed_token, _url_state) = split_state(state);
        let Some(stored_token) = stored_token.filter(|t| t == echoed_token) else {
            warn!("Callback CSRF token does not match the session");
            return self.outcome(FinishStatus::CsrfMismatch);
        };

        let grant = match self
            .provider
            .finish_redirect(&self.callback_url, &query, &stored_token)
            .await
        {
            Ok(grant) => grant,
            Err(e) => {
                warn!(error = %e, "Provider rejected authorization callback");
                return self.outcome(FinishStatus::from_provider_error(&e));
            }
        };

        let credential = match self
            .credentials
            .save(&credential_from_grant(grant, SAVE_NOTE))
        {
            Ok(credential) => credential,
            Err(e) => {
                error!(error = %e, "Failed to save access credential");
                return self.outcome(FinishStatus::Fault);
            }
        };
        info!(owner_id = %credential.owner_id, "Authorization finish successful");

        if let Some(remote) = &self.remote {
            if let Err(e) = remote::populate_sample_content(remote.as_ref(), &credential).await {
                warn!(error = %e, "Failed to populate sample remote content");
            }
        }

        self.outcome(FinishStatus::Success)
    }

    fn outcome(&self, status: FinishStatus) -> (FinishStatus, WorkflowResult) {
        let result = match status {
            FinishStatus::Success => WorkflowResult::ok(SUCCESS_BODY),
            FinishStatus::BadRequest => WorkflowResult::error(400, "Bad Request"),
            FinishStatus::CsrfMismatch => WorkflowResult::error(400, "CSRF token mismatch"),
            FinishStatus::BadState | FinishStatus::NotApproved => {
                WorkflowResult::redirect(self.restart_url.clone())
            }
            FinishStatus::ProviderError => WorkflowResult::error(503, "Service Unavailable"),
            FinishStatus::Fault => WorkflowResult::error(500, "Internal Server Error"),
        };
        debug!(?status, status_code = result.status_code, "Redirect flow finished");
        (status, result)
    }
}
