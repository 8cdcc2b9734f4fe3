//! Clever OAuth2 strategy
//!
//! This crate adapts [Clever](https://clever.com)'s OAuth2 endpoints to a
//! generic authentication pipeline: it builds the authorization redirect,
//! validates the returning callback, exchanges the authorization code for an
//! access token, and normalizes the user-info payload into a
//! framework-neutral identity.
//!
//! # Features
//!
//! - **Fixed endpoints**: Clever's authorize and token URLs never vary with
//!   the configured API site
//! - **Basic client auth**: the token exchange carries the client credentials
//!   in an HTTP Basic `Authorization` header, as Clever requires
//! - **Error short-circuit**: provider-reported errors (`error=access_denied`)
//!   fail the callback before any network call
//! - **Host-agnostic**: the incoming request and session are abstracted
//!   behind [`RequestSource`] and [`Session`], so test harnesses implement
//!   them directly
//! - **Explicit test mode**: [`Mode::Test`] replaces the token exchange with
//!   a synthesized token at construction time; there is no global toggle
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//! use clever_oauth2::{CleverProvider, CleverSettings, Mode, RequestSource, Session};
//!
//! struct CallbackRequest {
//!     params: BTreeMap<String, String>,
//! }
//!
//! impl RequestSource for CallbackRequest {
//!     fn params(&self) -> &BTreeMap<String, String> {
//!         &self.params
//!     }
//!     fn scheme(&self) -> &str {
//!         "https"
//!     }
//!     fn host(&self) -> &str {
//!         "app.example.com"
//!     }
//!     fn script_name(&self) -> &str {
//!         "/auth/clever"
//!     }
//! }
//!
//! # async fn example() -> Result<(), clever_oauth2::OAuthError> {
//! let settings = CleverSettings::new(
//!     std::env::var("CLEVER_CLIENT_ID").unwrap_or_default(),
//!     std::env::var("CLEVER_CLIENT_SECRET").unwrap_or_default(),
//! );
//! let provider = CleverProvider::new(settings, Mode::Live)?;
//!
//! let request = CallbackRequest { params: BTreeMap::new() };
//! let mut session = Session::new();
//!
//! // Request phase: send the browser to Clever.
//! let redirect = provider.authorize_redirect(&request, &mut session)?;
//! println!("redirecting to {redirect}");
//!
//! // Callback phase: the request now carries Clever's query parameters.
//! let auth = provider.callback_phase(&request, &mut session).await?;
//! println!("authenticated {} as uid {}", auth.provider, auth.uid);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! [`CleverSettings`] derives `serde`, so hosts can load it from their
//! configuration layer:
//!
//! ```toml
//! [auth.clever]
//! client_id = "your-clever-client-id"
//! client_secret = "your-clever-client-secret"
//! # optional, defaults shown
//! site = "https://api.clever.com"
//! callback_path = "/callback"
//! scopes = []
//! ```
//!
//! # Security Considerations
//!
//! - **State tokens**: the request phase stores a 32-byte random state token
//!   in the session; Clever does not reliably echo it back, so the callback
//!   never enforces the comparison. [`state::validate`] is general and
//!   enforces for providers that do echo state.
//! - **Credentials**: the client secret only ever travels in the Basic
//!   `Authorization` header of the server-to-server token exchange.
//! - **Single attempt**: neither the token exchange nor the user-info call is
//!   retried; a failure surfaces as a typed [`OAuthError`] for the host.

pub mod identity;
pub mod provider;
pub mod state;
pub mod token;
pub mod types;

pub use identity::{raw_info, AuthResult, BearerToken, RawIdentity, TokenSource, USER_INFO_PATH};
pub use provider::{CleverProvider, RequestSource, Session};
pub use state::STATE_SESSION_KEY;
pub use token::{exchange_code, token_params, TokenRequestParams};
pub use types::{
    CleverSettings, ConfiguredClient, Mode, OAuthError, OAuthToken, AUTHORIZE_URL,
    DEFAULT_CALLBACK_PATH, DEFAULT_SITE, PROVIDER_NAME, TOKEN_URL,
};
