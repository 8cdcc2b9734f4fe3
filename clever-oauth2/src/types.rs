//! Core types and configuration
//!
//! This module defines the foundational types for the Clever OAuth2 strategy,
//! including provider settings, access tokens, and the error taxonomy.

use oauth2::basic::BasicClient;
use oauth2::{EndpointNotSet, EndpointSet};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Name this provider registers under with a hosting auth framework
pub const PROVIDER_NAME: &str = "clever";

/// Authorization endpoint. Clever hosts it on the marketing domain, not the
/// API domain, so it never varies with [`CleverSettings::site`].
pub const AUTHORIZE_URL: &str = "https://clever.com/oauth/authorize";

/// Token endpoint, fixed for the same reason as [`AUTHORIZE_URL`]
pub const TOKEN_URL: &str = "https://clever.com/oauth/tokens";

/// Default API base the user-info call is issued against
pub const DEFAULT_SITE: &str = "https://api.clever.com";

/// Default path segment appended to the host mount point for the callback URL
pub const DEFAULT_CALLBACK_PATH: &str = "/callback";

/// Type alias for a configured OAuth2 client with auth and token endpoints set
///
/// The type parameters indicate which endpoints are configured:
/// - `EndpointSet` for `HasAuthUrl` - Authorization endpoint is configured
/// - `EndpointNotSet` for `HasDeviceAuthUrl` - Device auth not used
/// - `EndpointNotSet` for `HasIntrospectionUrl` - Token introspection not used
/// - `EndpointNotSet` for `HasRevocationUrl` - Token revocation not used
/// - `EndpointSet` for `HasTokenUrl` - Token exchange endpoint is configured
pub type ConfiguredClient = BasicClient<
    EndpointSet,    // HasAuthUrl
    EndpointNotSet, // HasDeviceAuthUrl
    EndpointNotSet, // HasIntrospectionUrl
    EndpointNotSet, // HasRevocationUrl
    EndpointSet,    // HasTokenUrl
>;

/// How the provider performs the callback phase
///
/// `Test` replaces the network token exchange with a synthesized token so the
/// rest of the callback pipeline stays observable without outbound calls. It
/// is passed at construction; there is no process-wide toggle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Exchange the authorization code against the real token endpoint
    #[default]
    Live,
    /// Skip the token exchange and synthesize a fixed token
    Test,
}

/// Settings for the Clever provider
///
/// Only the credentials are required; `site` may be overridden (e.g. for a
/// sandbox district), while the authorization and token endpoints are fixed
/// literals exposed through [`Self::authorize_url`] and [`Self::token_url`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleverSettings {
    /// OAuth2 client ID issued by Clever
    pub client_id: String,
    /// OAuth2 client secret issued by Clever
    pub client_secret: String,
    /// API base URL the user-info call is issued against
    #[serde(default = "default_site")]
    pub site: String,
    /// Path appended to the host mount point when building the callback URL
    #[serde(default = "default_callback_path")]
    pub callback_path: String,
    /// OAuth2 scopes to request during the authorization redirect
    #[serde(default)]
    pub scopes: Vec<String>,
}

fn default_site() -> String {
    DEFAULT_SITE.to_string()
}

fn default_callback_path() -> String {
    DEFAULT_CALLBACK_PATH.to_string()
}

impl CleverSettings {
    /// Create settings with the provider defaults
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            site: default_site(),
            callback_path: default_callback_path(),
            scopes: Vec::new(),
        }
    }

    /// Provider name used when registering with a hosting framework
    #[must_use]
    pub const fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    /// Authorization endpoint, fixed regardless of `site`
    #[must_use]
    pub const fn authorize_url(&self) -> &'static str {
        AUTHORIZE_URL
    }

    /// Token endpoint, fixed regardless of `site`
    #[must_use]
    pub const fn token_url(&self) -> &'static str {
        TOKEN_URL
    }

    /// Whether callback state enforcement is disabled for this provider
    ///
    /// Clever does not reliably echo the `state` parameter back on the
    /// callback, so enforcement is permanently off. [`crate::state::validate`]
    /// itself stays general; stricter providers can enforce.
    #[must_use]
    pub const fn provider_ignores_state(&self) -> bool {
        true
    }
}

/// OAuth2 access token returned by the token endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthToken {
    /// Access token
    pub access_token: String,
    /// Refresh token (if provided)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Token type (usually "Bearer")
    pub token_type: String,
    /// When the token expires
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<SystemTime>,
    /// OAuth2 scopes granted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
}

impl OAuthToken {
    /// Check if the access token has expired
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires| SystemTime::now() > expires)
    }
}

/// Errors surfaced to the hosting framework from either OAuth2 phase
///
/// Every failure terminates the current callback; nothing is retried. The
/// short symbolic code a host typically keys failure pages off is exposed via
/// [`Self::kind`].
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Provider redirected back with an `error` query parameter
    #[error("provider returned error: {error}")]
    Provider {
        /// Literal error code from the provider (e.g. `access_denied`)
        error: String,
        /// Human-readable `error_description`, when the provider sent one
        description: Option<String>,
    },

    /// State token missing or mismatched on the callback (potential CSRF attack)
    #[error("CSRF detected")]
    CsrfDetected,

    /// Authorization code exchange failed
    #[error("Failed to exchange authorization code for token: {0}")]
    TokenExchangeFailed(String),

    /// Failed to fetch user info
    #[error("Failed to fetch user information: {0}")]
    UserInfoFailed(String),

    /// Required identity field absent from the provider payload
    #[error("Required identity field missing: {0}")]
    MissingField(&'static str),

    /// Generic OAuth2 error
    #[error("OAuth2 error: {0}")]
    Generic(String),
}

impl OAuthError {
    /// Short symbolic code identifying the failure
    ///
    /// For provider-reported errors this is the literal code the provider
    /// sent, so `error=access_denied` surfaces as `access_denied`.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Provider { error, .. } => error,
            Self::CsrfDetected => "csrf_detected",
            Self::TokenExchangeFailed(_) => "token_exchange_failed",
            Self::UserInfoFailed(_) => "user_info_failed",
            Self::MissingField(_) => "missing_field",
            Self::Generic(_) => "oauth_error",
        }
    }

    /// Human-readable description, when one exists beyond the kind
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Provider { description, .. } => description.as_deref(),
            Self::CsrfDetected => Some("CSRF detected"),
            _ => None,
        }
    }
}
