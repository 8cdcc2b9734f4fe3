//! The Clever OAuth2 strategy
//!
//! [`CleverProvider`] adapts Clever's OAuth2 endpoints to a host
//! authentication pipeline in two phases:
//! - request phase: [`CleverProvider::authorize_redirect`] stores a state
//!   token in the session and returns the authorization URL to redirect to
//! - callback phase: [`CleverProvider::callback_phase`] validates the
//!   returning request, exchanges the code, fetches the raw identity, and
//!   normalizes it into an [`AuthResult`]
//!
//! The host request surface is abstracted behind [`RequestSource`] and
//! [`Session`], so any middleware stack (or a plain test harness) can drive
//! the strategy.

use std::collections::BTreeMap;
use std::sync::Arc;

use oauth2::basic::BasicClient;
use oauth2::{AuthUrl, ClientId, ClientSecret, CsrfToken, RedirectUrl, Scope, TokenUrl};

use crate::identity::{raw_info, AuthResult, BearerToken, TokenSource};
use crate::state::{self, STATE_SESSION_KEY};
use crate::token;
use crate::types::{CleverSettings, ConfiguredClient, Mode, OAuthError, OAuthToken, PROVIDER_NAME};

/// Read-only view of the incoming HTTP request the host hands the strategy
///
/// Implementations wrap whatever request type the hosting framework uses;
/// tests implement it directly on plain structs.
pub trait RequestSource {
    /// Query parameters of the request
    fn params(&self) -> &BTreeMap<String, String>;

    /// Request scheme, `http` or `https`
    fn scheme(&self) -> &str;

    /// Host authority, including the port when non-default
    fn host(&self) -> &str;

    /// Mount prefix the hosting middleware runs under, may be empty
    fn script_name(&self) -> &str;

    /// Scheme and authority joined, e.g. `http://localhost:3000`
    fn full_host(&self) -> String {
        format!("{}://{}", self.scheme(), self.host())
    }
}

/// Per-request session values, owned by the host
///
/// The strategy only reads and writes the entries it is handed; persistence
/// across the redirect round trip is the host's concern.
#[derive(Debug, Clone, Default)]
pub struct Session {
    values: BTreeMap<String, String>,
}

impl Session {
    /// Create an empty session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a session value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Write a session value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Remove a session value, returning it if present
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }
}

/// Clever OAuth2 provider
pub struct CleverProvider {
    settings: CleverSettings,
    mode: Mode,
    client: ConfiguredClient,
    http: reqwest::Client,
    token_source: Option<Arc<dyn TokenSource>>,
}

impl CleverProvider {
    /// Create a new Clever provider
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Generic`] if an endpoint literal fails URL
    /// validation.
    pub fn new(settings: CleverSettings, mode: Mode) -> Result<Self, OAuthError> {
        // oauth2 5.0 API: BasicClient::new() only takes ClientId
        let client = BasicClient::new(ClientId::new(settings.client_id.clone()))
            .set_client_secret(ClientSecret::new(settings.client_secret.clone()))
            .set_auth_uri(
                AuthUrl::new(settings.authorize_url().to_string())
                    .map_err(|e| OAuthError::Generic(format!("Invalid auth URL: {e}")))?,
            )
            .set_token_uri(
                TokenUrl::new(settings.token_url().to_string())
                    .map_err(|e| OAuthError::Generic(format!("Invalid token URL: {e}")))?,
            );

        Ok(Self {
            settings,
            mode,
            client,
            http: reqwest::Client::new(),
            token_source: None,
        })
    }

    /// Replace the live user-info client with another [`TokenSource`]
    ///
    /// Meant for [`Mode::Test`], where the synthesized token has nothing real
    /// to call the API with.
    #[must_use]
    pub fn with_token_source(mut self, source: Arc<dyn TokenSource>) -> Self {
        self.token_source = Some(source);
        self
    }

    /// Settings this provider was built with
    #[must_use]
    pub const fn settings(&self) -> &CleverSettings {
        &self.settings
    }

    /// Mode this provider runs in
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Callback URL the provider redirects back to
    ///
    /// Plain concatenation of the request's full host, the mount prefix, and
    /// the configured callback path; no normalization.
    #[must_use]
    pub fn callback_url(&self, request: &impl RequestSource) -> String {
        format!(
            "{}{}{}",
            request.full_host(),
            request.script_name(),
            self.settings.callback_path
        )
    }

    /// Begin the authorization-code flow
    ///
    /// Generates a state token, stores it under [`STATE_SESSION_KEY`], and
    /// returns the authorization URL to redirect the browser to.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Generic`] when the computed callback URL is not
    /// a valid redirect URI.
    pub fn authorize_redirect(
        &self,
        request: &impl RequestSource,
        session: &mut Session,
    ) -> Result<String, OAuthError> {
        let state = state::generate();
        session.set(STATE_SESSION_KEY, state.clone());

        let redirect = RedirectUrl::new(self.callback_url(request))
            .map_err(|e| OAuthError::Generic(format!("Invalid redirect URI: {e}")))?;

        let client = self.client.clone().set_redirect_uri(redirect);
        let mut auth_request = client.authorize_url(|| CsrfToken::new(state));
        for scope in &self.settings.scopes {
            auth_request = auth_request.add_scope(Scope::new(scope.clone()));
        }

        let (auth_url, _state) = auth_request.url();
        Ok(auth_url.to_string())
    }

    /// Complete the authorization-code flow
    ///
    /// Runs the callback steps in strict order: provider-error short-circuit,
    /// state comparison (never enforced for Clever), token exchange, user-info
    /// fetch, identity normalization. The first failure ends the callback.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Provider`] when the provider reported an error,
    /// [`OAuthError::CsrfDetected`] on an enforced state mismatch, and the
    /// exchange/user-info/mapping errors of the later steps otherwise.
    pub async fn callback_phase(
        &self,
        request: &impl RequestSource,
        session: &mut Session,
    ) -> Result<AuthResult, OAuthError> {
        let params = request.params();

        if let Some(error) = params.get("error") {
            let description = params.get("error_description").cloned();
            tracing::warn!(
                provider = PROVIDER_NAME,
                error = %error,
                description = description.as_deref().unwrap_or_default(),
                "Provider returned an error on callback"
            );
            return Err(OAuthError::Provider {
                error: error.clone(),
                description,
            });
        }

        let stored = session.get(STATE_SESSION_KEY).map(ToString::to_string);
        let incoming = params.get("state").map(String::as_str);
        if let Err(err) =
            state::validate(stored.as_deref(), incoming, !self.settings.provider_ignores_state())
        {
            tracing::warn!(
                provider = PROVIDER_NAME,
                "State token mismatch on callback (potential CSRF attack)"
            );
            return Err(err);
        }
        // One-time use: the round trip is over either way.
        session.remove(STATE_SESSION_KEY);

        let token = self.acquire_token(request).await?;
        let source = self.user_info_source(token);
        let raw = raw_info(source.as_ref()).await?;

        let auth = AuthResult::from_raw(&raw)?;
        tracing::info!(
            provider = PROVIDER_NAME,
            uid = %auth.uid,
            "User authenticated"
        );
        Ok(auth)
    }

    /// Obtain an access token for the current callback
    async fn acquire_token(&self, request: &impl RequestSource) -> Result<OAuthToken, OAuthError> {
        if self.mode == Mode::Test {
            return Ok(OAuthToken {
                access_token: "test-access-token".to_string(),
                refresh_token: None,
                token_type: "Bearer".to_string(),
                expires_at: None,
                scopes: None,
            });
        }

        let code = request.params().get("code").ok_or_else(|| {
            OAuthError::TokenExchangeFailed("authorization code missing from callback".to_string())
        })?;

        let params = token::token_params(&self.settings);
        token::exchange_code(
            &self.http,
            self.settings.token_url(),
            &params,
            code,
            &self.callback_url(request),
        )
        .await
    }

    /// User-info source for the given token: the injected override when
    /// present, otherwise a live bearer client against the configured site
    fn user_info_source(&self, token: OAuthToken) -> Arc<dyn TokenSource> {
        self.token_source.clone().unwrap_or_else(|| {
            Arc::new(BearerToken::new(
                self.http.clone(),
                self.settings.site.clone(),
                token,
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubRequest {
        params: BTreeMap<String, String>,
        script_name: &'static str,
    }

    impl StubRequest {
        fn new() -> Self {
            Self {
                params: BTreeMap::new(),
                script_name: "",
            }
        }
    }

    impl RequestSource for StubRequest {
        fn params(&self) -> &BTreeMap<String, String> {
            &self.params
        }

        fn scheme(&self) -> &str {
            "http"
        }

        fn host(&self) -> &str {
            "localhost:3000"
        }

        fn script_name(&self) -> &str {
            self.script_name
        }
    }

    fn test_provider() -> CleverProvider {
        CleverProvider::new(CleverSettings::new("TEST_ID", "TEST_SECRET"), Mode::Test).unwrap()
    }

    #[test]
    fn test_callback_url_concatenates_parts() {
        let provider = test_provider();
        let request = StubRequest {
            params: BTreeMap::new(),
            script_name: "/auth",
        };
        assert_eq!(
            provider.callback_url(&request),
            "http://localhost:3000/auth/callback"
        );
    }

    #[test]
    fn test_callback_url_with_empty_script_name() {
        let provider = test_provider();
        let request = StubRequest::new();
        assert_eq!(
            provider.callback_url(&request),
            "http://localhost:3000/callback"
        );
    }

    #[test]
    fn test_authorize_redirect_stores_state_and_builds_url() {
        let provider = test_provider();
        let request = StubRequest {
            params: BTreeMap::new(),
            script_name: "/auth",
        };
        let mut session = Session::new();

        let url = provider.authorize_redirect(&request, &mut session).unwrap();
        let state = session.get(STATE_SESSION_KEY).expect("state not stored");

        assert!(url.starts_with("https://clever.com/oauth/authorize"));
        assert!(url.contains("client_id=TEST_ID"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains(&format!("state={state}")));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fcallback"));
    }

    #[test]
    fn test_authorize_redirect_includes_scopes() {
        let mut settings = CleverSettings::new("TEST_ID", "TEST_SECRET");
        settings.scopes = vec!["read:district_admins".to_string()];
        let provider = CleverProvider::new(settings, Mode::Test).unwrap();
        let request = StubRequest::new();
        let mut session = Session::new();

        let url = provider.authorize_redirect(&request, &mut session).unwrap();
        assert!(url.contains("scope=read%3Adistrict_admins"));
    }

    #[test]
    fn test_session_round_trip() {
        let mut session = Session::new();
        assert!(session.get("missing").is_none());

        session.set("key", "value");
        assert_eq!(session.get("key"), Some("value"));

        assert_eq!(session.remove("key"), Some("value".to_string()));
        assert!(session.get("key").is_none());
    }
}
