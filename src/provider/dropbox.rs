//! Dropbox-style OAuth 2.0 provider over HTTP.
//!
//! Builds the authorization page URLs for both flows, validates the redirect
//! callback query and exchanges codes at the token endpoint.

use super::exchange::exchange_code_for_token;
use super::{AuthorizationProvider, ProviderError, ProviderGrant};
use crate::config::AppConfig;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Callback `error` value meaning the user clicked "Cancel"
const ACCESS_DENIED: &str = "access_denied";

pub struct DropboxProvider {
    app: AppConfig,
    client: reqwest::Client,
}

impl DropboxProvider {
    pub fn new(app: AppConfig) -> Self {
        Self {
            app,
            client: reqwest::Client::new(),
        }
    }

    /// Build authorization URL, with redirect_uri and state for the redirect flow
    fn authorize_url(&self, redirect: Option<(&str, &str)>) -> String {
        let mut params = vec![
            ("response_type", "code"),
            ("client_id", self.app.key.as_str()),
        ];
        if let Some((redirect_uri, state)) = redirect {
            params.push(("redirect_uri", redirect_uri));
            params.push(("state", state));
        }

        // Serializing a list of string pairs cannot fail
        let query = serde_urlencoded::to_string(&params).unwrap_or_default();
        format!("{}?{}", self.app.authorize_url, query)
    }
}

/// Split an echoed `state` into the CSRF token and the optional URL state after `|`
pub fn split_state(state: &str) -> (&str, Option<&str>) {
    match state.split_once('|') {
        Some((csrf, url_state)) => (csrf, Some(url_state)),
        None => (state, None),
    }
}

/// Check a redirect callback query before any code exchange.
///
/// Returns the authorization code on success.
pub fn validate_callback<'a>(
    query: &'a HashMap<String, String>,
    csrf_token: &str,
) -> Result<&'a str, ProviderError> {
    let state = query
        .get("state")
        .ok_or_else(|| ProviderError::BadRequest("missing query parameter 'state'".to_string()))?;

    let code = query.get("code");
    let error = query.get("error");
    match (code, error) {
        (Some(_), Some(_)) => {
            return Err(ProviderError::BadRequest(
                "query parameters 'code' and 'error' are both set".to_string(),
            ))
        }
        (None, None) => {
            return Err(ProviderError::BadRequest(
                "neither query parameter 'code' nor 'error' is set".to_string(),
            ))
        }
        _ => {}
    }

    if csrf_token.is_empty() {
        return Err(ProviderError::BadState("no CSRF token in session".to_string()));
    }

    let (echoed, _url_state) = split_state(state);
    if echoed != csrf_token {
        return Err(ProviderError::Csrf(format!(
            "expected {csrf_token:?}, got {echoed:?}"
        )));
    }

    if let Some(error) = error {
        let description = query
            .get("error_description")
            .cloned()
            .unwrap_or_default();
        return Err(if error == ACCESS_DENIED {
            ProviderError::NotApproved(description)
        } else if description.is_empty() {
            ProviderError::Provider(error.clone())
        } else {
            ProviderError::Provider(format!("{error}: {description}"))
        });
    }

    // One of code/error is set and error was handled above
    code.map(String::as_str)
        .ok_or_else(|| ProviderError::BadRequest("missing query parameter 'code'".to_string()))
}

#[async_trait]
impl AuthorizationProvider for DropboxProvider {
    fn start_no_redirect(&self) -> String {
        debug!(app = %self.app.name, "Building no-redirect authorization URL");
        self.authorize_url(None)
    }

    async fn finish_no_redirect(&self, code: &str) -> Result<ProviderGrant, ProviderError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ProviderError::BadRequest("empty authorization code".to_string()));
        }

        exchange_code_for_token(
            &self.client,
            &self.app.token_url,
            code,
            None,
            &self.app.key,
            &self.app.secret,
        )
        .await
    }

    fn start_redirect(&self, callback_url: &str, csrf_token: &str) -> String {
        debug!(
            app = %self.app.name,
            callback_url = %callback_url,
            "Building redirect authorization URL"
        );
        self.authorize_url(Some((callback_url, csrf_token)))
    }

    async fn finish_redirect(
        &self,
        callback_url: &str,
        query: &HashMap<String, String>,
        csrf_token: &str,
    ) -> Result<ProviderGrant, ProviderError> {
        let code = validate_callback(query, csrf_token).map_err(|e| {
            warn!(error = %e, "Rejected authorization callback");
            e
        })?;

        exchange_code_for_token(
            &self.client,
            &self.app.token_url,
            code,
            Some(callback_url),
            &self.app.key,
            &self.app.secret,
        )
        .await
    }
}
