//! Authorization workflow coordinator.
//!
//! Two flows produce the same durable [`AccessCredential`]:
//! 1. No-redirect: `start` yields the provider page, the user pastes the code
//!    shown there, `finish_and_save` exchanges and persists it
//! 2. Redirect: `start` arms a CSRF session and yields the provider page; the
//!    provider redirects the browser to the callback listener, which calls
//!    `finish`; the client process polls the credential store for the result
//!
//! Expected outcomes (CSRF mismatch, user declined, ...) are ordinary
//! [`WorkflowResult`] values. Faults abort with [`WorkflowError`].

mod no_redirect;
mod query;
mod redirect;

pub use no_redirect::NoRedirectWorkflow;
pub use query::{parse_query, QueryError};
pub use redirect::{FinishStatus, RedirectWorkflow};

use crate::credentials::AccessCredential;
use crate::files::StoreError;
use crate::provider::ProviderError;
use thiserror::Error;

/// Outcome of a workflow step, rendered back to a browser or terminal.
///
/// - 200: success, `body` is shown to the user
/// - 301: the caller must follow `redirect_target`
/// - 4xx/5xx: failure, `body` is a short human-readable reason
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkflowResult {
    pub status_code: u16,
    pub body: String,
    pub redirect_target: Option<String>,
}

impl WorkflowResult {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            body: body.into(),
            redirect_target: None,
        }
    }

    pub fn redirect(target: impl Into<String>) -> Self {
        Self {
            status_code: 301,
            body: String::new(),
            redirect_target: Some(target.into()),
        }
    }

    pub fn error(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            body: body.into(),
            redirect_target: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

/// Faults surfaced to terminal callers
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The wait for the credential was cancelled or timed out
    #[error("authorization cancelled before a credential appeared")]
    Cancelled,

    /// `start` did not produce a URL to send the user to
    #[error("authorization start failed with status {status_code}: {body}")]
    Start { status_code: u16, body: String },

    /// An external collaborator (browser, code prompt) failed
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

/// Build the credential record from a provider grant
pub(crate) fn credential_from_grant(
    grant: crate::provider::ProviderGrant,
    note: &str,
) -> AccessCredential {
    AccessCredential::new(grant.token, grant.owner_id, note)
}
