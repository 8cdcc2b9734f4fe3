//! Token-exchange request construction and the authorization-code grant
//!
//! Clever authenticates clients on the token endpoint with HTTP Basic
//! credentials rather than `client_id`/`client_secret` form fields, so the
//! exchange request is built explicitly here: [`token_params`] produces the
//! headers and extra body fields, [`exchange_code`] performs the single-shot
//! POST and parses the token response.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

use crate::types::{CleverSettings, OAuthError, OAuthToken};

/// Headers and body fields added to the token-exchange request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenRequestParams {
    /// HTTP headers to send with the exchange request
    pub headers: BTreeMap<String, String>,
    /// Extra form fields merged into the exchange request body
    pub body: BTreeMap<String, String>,
}

/// Build the token-request parameters for the given settings
///
/// Always includes an `Authorization` header carrying the client credentials
/// as standard Basic auth (`base64(client_id ":" client_secret)`, padding
/// kept).
#[must_use]
pub fn token_params(settings: &CleverSettings) -> TokenRequestParams {
    let credentials = STANDARD.encode(format!(
        "{}:{}",
        settings.client_id, settings.client_secret
    ));

    let mut headers = BTreeMap::new();
    headers.insert("Authorization".to_string(), format!("Basic {credentials}"));

    TokenRequestParams {
        headers,
        body: BTreeMap::new(),
    }
}

/// Wire shape of a token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

impl From<TokenResponse> for OAuthToken {
    fn from(response: TokenResponse) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            token_type: response
                .token_type
                .unwrap_or_else(|| "Bearer".to_string()),
            expires_at: response
                .expires_in
                .map(|secs| SystemTime::now() + Duration::from_secs(secs)),
            scopes: response
                .scope
                .map(|scope| scope.split(' ').map(ToString::to_string).collect()),
        }
    }
}

/// Exchange an authorization code for an access token
///
/// Issues a single `POST` to `token_url` with the authorization-code grant
/// fields plus everything in `params`. There is no retry; transport failures
/// and non-2xx responses fail the whole callback.
///
/// # Errors
///
/// Returns [`OAuthError::TokenExchangeFailed`] if the request cannot be sent,
/// the endpoint answers with a non-success status, or the response body is
/// not a token JSON object.
pub async fn exchange_code(
    http: &reqwest::Client,
    token_url: &str,
    params: &TokenRequestParams,
    code: &str,
    redirect_uri: &str,
) -> Result<OAuthToken, OAuthError> {
    let mut form = params.body.clone();
    form.insert("grant_type".to_string(), "authorization_code".to_string());
    form.insert("code".to_string(), code.to_string());
    form.insert("redirect_uri".to_string(), redirect_uri.to_string());

    let mut request = http.post(token_url).form(&form);
    for (name, value) in &params.headers {
        request = request.header(name.as_str(), value.as_str());
    }

    let response = request
        .send()
        .await
        .map_err(|e| OAuthError::TokenExchangeFailed(e.to_string()))?;

    if !response.status().is_success() {
        return Err(OAuthError::TokenExchangeFailed(format!(
            "HTTP {}",
            response.status()
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| OAuthError::TokenExchangeFailed(format!("Failed to parse token JSON: {e}")))?;

    Ok(token.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_params_includes_authorization_header() {
        let settings = CleverSettings::new("TEST_ID", "TEST_SECRET");
        let params = token_params(&settings);
        assert!(params.headers.contains_key("Authorization"));
    }

    #[test]
    fn test_token_params_encodes_credentials() {
        let settings = CleverSettings::new("TEST_ID", "TEST_SECRET");
        let params = token_params(&settings);

        let encoded = STANDARD.encode("TEST_ID:TEST_SECRET");
        assert_eq!(
            params.headers.get("Authorization"),
            Some(&format!("Basic {encoded}"))
        );
    }

    #[test]
    fn test_token_params_body_is_empty() {
        let settings = CleverSettings::new("TEST_ID", "TEST_SECRET");
        assert!(token_params(&settings).body.is_empty());
    }

    #[test]
    fn test_token_response_fills_defaults() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token": "abc123"}"#).unwrap();
        let token = OAuthToken::from(response);
        assert_eq!(token.access_token, "abc123");
        assert_eq!(token.token_type, "Bearer");
        assert!(token.refresh_token.is_none());
        assert!(token.expires_at.is_none());
        assert!(token.scopes.is_none());
    }

    #[test]
    fn test_token_response_splits_scopes() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token": "abc123", "token_type": "bearer", "expires_in": 3600, "scope": "read:students read:teachers"}"#,
        )
        .unwrap();
        let token = OAuthToken::from(response);
        assert_eq!(token.token_type, "bearer");
        assert!(token.expires_at.is_some());
        assert_eq!(
            token.scopes,
            Some(vec![
                "read:students".to_string(),
                "read:teachers".to_string()
            ])
        );
    }
}
