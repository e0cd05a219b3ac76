//! Remote OAuth authorization provider.
//!
//! The workflows only see the [`AuthorizationProvider`] trait; the concrete
//! HTTP implementation lives in [`dropbox`].

pub mod dropbox;
mod exchange;

pub use dropbox::DropboxProvider;

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// Token and account id returned by a successful exchange
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderGrant {
    pub token: String,
    pub owner_id: String,
}

/// Typed provider-side failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The callback or exchange request was malformed
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No CSRF session to check the callback against
    #[error("bad state: {0}")]
    BadState(String),

    /// The echoed CSRF token did not match the session
    #[error("CSRF token mismatch: {0}")]
    Csrf(String),

    /// The user declined consent
    #[error("authorization not approved: {0}")]
    NotApproved(String),

    /// The provider failed or returned an error
    #[error("provider error: {0}")]
    Provider(String),
}

/// Remote OAuth endpoint driving both authorization flows.
///
/// # Lifecycle
/// 1. Workflow calls `start_*` to get the provider-hosted authorization URL
/// 2. User approves on the provider's site
/// 3. The code comes back either pasted by the user (`finish_no_redirect`)
///    or via the browser redirect to the callback listener (`finish_redirect`)
/// 4. Provider exchanges the code for a token
#[async_trait]
pub trait AuthorizationProvider: Send + Sync {
    /// Authorization page URL for the no-redirect flow (the provider shows the code to the user)
    fn start_no_redirect(&self) -> String;

    /// Exchange a code the user copied from the provider's page
    async fn finish_no_redirect(&self, code: &str) -> Result<ProviderGrant, ProviderError>;

    /// Authorization page URL that redirects back to `callback_url` with
    /// `csrf_token` echoed in `state`
    fn start_redirect(&self, callback_url: &str, csrf_token: &str) -> String;

    /// Validate the callback query against `csrf_token` and exchange its code.
    ///
    /// `callback_url` must equal the one passed to `start_redirect`.
    async fn finish_redirect(
        &self,
        callback_url: &str,
        query: &HashMap<String, String>,
        csrf_token: &str,
    ) -> Result<ProviderGrant, ProviderError>;
}
