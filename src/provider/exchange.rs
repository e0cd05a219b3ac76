//! OAuth token exchange logic.
//!
//! Handles exchanging authorization codes for access tokens.

use super::{ProviderError, ProviderGrant};
use reqwest::StatusCode;
use serde::Deserialize;

/// OAuth token response (Dropbox flavour of OAuth 2.0)
#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    uid: Option<String>,
    #[serde(default)]
    account_id: Option<String>,
}

/// Exchange authorization code for access token
///
/// # Arguments
/// * `token_url` - OAuth token endpoint URL
/// * `code` - Authorization code from callback or pasted by the user
/// * `redirect_uri` - Redirect URI used in the authorization request (none for no-redirect)
/// * `client_id` - App key
/// * `client_secret` - App secret
///
/// # Returns
/// * `Ok(ProviderGrant)` - Access token and account id
/// * `Err(ProviderError::BadRequest)` - Provider rejected the code (400)
/// * `Err(ProviderError::Provider)` - Transport failure or any other provider error
pub async fn exchange_code_for_token(
    client: &reqwest::Client,
    token_url: &str,
    code: &str,
    redirect_uri: Option<&str>,
    client_id: &str,
    client_secret: &str,
) -> Result<ProviderGrant, ProviderError> {
    let mut form_data = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("client_id", client_id),
        ("client_secret", client_secret),
    ];
    if let Some(redirect_uri) = redirect_uri {
        form_data.push(("redirect_uri", redirect_uri));
    }

    tracing::debug!("Exchanging authorization code for token at {}", token_url);

    let response = client
        .post(token_url)
        .header("Accept", "application/json")
        .form(&form_data)
        .send()
        .await
        .map_err(|e| ProviderError::Provider(format!("token request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let message = format!("token exchange failed with status {status}: {body}");
        return Err(if status == StatusCode::BAD_REQUEST {
            ProviderError::BadRequest(message)
        } else {
            ProviderError::Provider(message)
        });
    }

    let token_response: TokenResponse = response
        .json()
        .await
        .map_err(|e| ProviderError::Provider(format!("failed to parse token response: {e}")))?;

    if token_response
        .token_type
        .as_deref()
        .is_some_and(|t| !t.eq_ignore_ascii_case("bearer"))
    {
        return Err(ProviderError::Provider(format!(
            "unsupported token type {:?}",
            token_response.token_type
        )));
    }

    let owner_id = token_response
        .uid
        .or(token_response.account_id)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ProviderError::Provider("token response has no account id".to_string()))?;

    tracing::debug!(owner_id = %owner_id, "Token exchange successful");

    Ok(ProviderGrant {
        token: token_response.access_token,
        owner_id,
    })
}
