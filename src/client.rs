//! Client-side drivers for both authorization flows.
//!
//! Each flow starts from scratch: any existing credential is deleted first,
//! and a failure is reported without retry so the user re-drives the flow.

use crate::credentials::{AccessCredential, CredentialStore};
use crate::session::CsrfSessionStore;
use crate::wait::WaitSchedule;
use crate::workflow::{NoRedirectWorkflow, RedirectWorkflow, WorkflowError, WorkflowResult};
use anyhow::Context;
use std::io;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const LISTENER_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Shows the provider's authorization page to the user
pub trait Browser: Send + Sync {
    fn open(&self, url: &str) -> anyhow::Result<()>;
}

fn redirect_target(result: WorkflowResult) -> Result<String, WorkflowError> {
    match result.redirect_target {
        Some(url) if result.status_code == 301 => Ok(url),
        _ => Err(WorkflowError::Start {
            status_code: result.status_code,
            body: result.body,
        }),
    }
}

/// Whether a callback listener already answers `GET home_url` with 200.
///
/// Lets the redirect driver reuse a listener started separately instead of
/// failing to bind its port.
pub async fn listener_running(home_url: &str) -> bool {
    let client = match reqwest::Client::builder()
        .timeout(LISTENER_CHECK_TIMEOUT)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            debug!(error = %e, "Failed to build listener check client");
            return false;
        }
    };

    match client.get(home_url).send().await {
        Ok(response) => response.status() == reqwest::StatusCode::OK,
        Err(e) => {
            debug!(home_url, error = %e, "No callback listener answering");
            false
        }
    }
}

/// Run the redirect flow from the client side.
///
/// The callback listener must already be running; it writes the credential
/// when the provider redirects the browser back. This side only waits for
/// the credential file to appear.
pub async fn authorise_redirect(
    workflow: &RedirectWorkflow,
    credentials: &CredentialStore,
    browser: &dyn Browser,
    schedule: WaitSchedule,
    cancel: &CancellationToken,
) -> Result<AccessCredential, WorkflowError> {
    credentials.delete()?;

    let url = redirect_target(workflow.start()?)?;
    browser.open(&url).context("Failed to open browser")?;

    info!(callback_url = %workflow.callback_url(), "Waiting for the provider to call back");
    if !credentials.wait_until_present(schedule, cancel).await {
        return Err(WorkflowError::Cancelled);
    }

    let credential = credentials.load()?;
    info!(owner_id = %credential.owner_id, "Redirect authorization completed");
    Ok(credential)
}

/// Run the no-redirect flow; `read_code` prompts for the code the provider displayed.
///
/// Returns `WorkflowError::Cancelled` as soon as `cancel` fires. The blocking
/// prompt itself cannot be interrupted and keeps its thread until it returns,
/// so a process cancelling here should exit rather than wait for it.
pub async fn authorise_no_redirect<F>(
    workflow: &NoRedirectWorkflow,
    credentials: &CredentialStore,
    browser: &dyn Browser,
    read_code: F,
    cancel: &CancellationToken,
) -> Result<AccessCredential, WorkflowError>
where
    F: FnOnce() -> io::Result<String> + Send + 'static,
{
    credentials.delete()?;

    let url = redirect_target(workflow.start())?;
    browser.open(&url).context("Failed to open browser")?;

    let prompt = tokio::task::spawn_blocking(read_code);
    let code = tokio::select! {
        _ = cancel.cancelled() => {
            info!("Code prompt cancelled");
            return Err(WorkflowError::Cancelled);
        }
        joined = prompt => joined
            .context("Code prompt task failed")?
            .context("Failed to read authorization code")?,
    };

    let credential = workflow.finish_and_save(code.trim()).await?;
    info!(owner_id = %credential.owner_id, "No-redirect authorization completed");
    Ok(credential)
}

/// Contents of the credential file, or a line saying it does not exist
pub fn describe_credential_file(credentials: &CredentialStore) -> String {
    match std::fs::read_to_string(credentials.path()) {
        Ok(contents) => format!(
            "CONTENTS OF {}:\n{}",
            credentials.path().display(),
            contents.trim_end()
        ),
        Err(_) => format!(
            "token file {} does not exist",
            credentials.path().display()
        ),
    }
}

/// Remove the stored credential and any CSRF session artifacts so the next
/// run must re-authorize from scratch
pub fn logout(
    credentials: &CredentialStore,
    sessions: &CsrfSessionStore,
) -> Result<(), WorkflowError> {
    credentials.delete()?;
    sessions.delete_files()?;
    Ok(())
}
