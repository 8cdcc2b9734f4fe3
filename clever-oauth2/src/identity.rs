//! Provider payload schema and identity normalization
//!
//! Clever's user-info endpoint wraps the interesting fields in an envelope:
//! a top-level `type` naming the kind of account (`student`, `teacher`, ...)
//! and a `data` object keyed by whatever fields the district shares.
//! [`RawIdentity`] models that envelope explicitly; the mapping methods
//! produce the framework-neutral identity shape a host consumes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{OAuthError, OAuthToken, PROVIDER_NAME};

/// Path on [`crate::CleverSettings::site`] the raw identity is fetched from
pub const USER_INFO_PATH: &str = "/me";

/// Raw user-info payload as returned by the provider
///
/// `data.id` is the only field this crate requires; everything else passes
/// through opaquely. Unrecognized top-level keys (Clever sends `links`, for
/// one) are retained so [`Self::extra`] can hand back the whole payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawIdentity {
    /// Account kind, e.g. `student` or `teacher`; not always present
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
    /// Provider-chosen fields for this account, passed through unmodified
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Any other top-level keys in the payload
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl RawIdentity {
    /// Parse a user-info response body
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::UserInfoFailed`] if the value is not an object of
    /// the expected envelope shape.
    pub fn from_value(value: Value) -> Result<Self, OAuthError> {
        serde_json::from_value(value)
            .map_err(|e| OAuthError::UserInfoFailed(format!("Unexpected user info shape: {e}")))
    }

    /// Stable identifier for this account
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::MissingField`] when `data.id` is absent or not a
    /// string.
    pub fn uid(&self) -> Result<String, OAuthError> {
        self.data
            .get("id")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or(OAuthError::MissingField("data.id"))
    }

    /// Normalized info mapping
    ///
    /// `user_type` is always present (null when the payload carried no
    /// `type`), followed by every `data` field unchanged — no renaming, no
    /// filtering.
    #[must_use]
    pub fn info(&self) -> Map<String, Value> {
        let mut info = Map::new();
        info.insert(
            "user_type".to_string(),
            self.user_type.clone().map_or(Value::Null, Value::String),
        );
        for (key, value) in &self.data {
            info.insert(key.clone(), value.clone());
        }
        info
    }

    /// Extra mapping retaining the entire raw payload under `raw_info`
    #[must_use]
    pub fn extra(&self) -> Map<String, Value> {
        let mut raw = Map::new();
        if let Some(user_type) = &self.user_type {
            raw.insert("type".to_string(), Value::String(user_type.clone()));
        }
        raw.insert("data".to_string(), Value::Object(self.data.clone()));
        for (key, value) in &self.rest {
            raw.insert(key.clone(), value.clone());
        }

        let mut extra = Map::new();
        extra.insert("raw_info".to_string(), Value::Object(raw));
        extra
    }
}

/// Framework-neutral result of a successful callback
#[derive(Debug, Clone, Serialize)]
pub struct AuthResult {
    /// Provider name, always `clever`
    pub provider: &'static str,
    /// Stable provider-side account identifier
    pub uid: String,
    /// Normalized identity fields, see [`RawIdentity::info`]
    pub info: Map<String, Value>,
    /// Pass-through payload, see [`RawIdentity::extra`]
    pub extra: Map<String, Value>,
}

impl AuthResult {
    /// Build the auth result from a raw payload
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::MissingField`] when the payload has no usable
    /// `data.id`.
    pub fn from_raw(raw: &RawIdentity) -> Result<Self, OAuthError> {
        Ok(Self {
            provider: PROVIDER_NAME,
            uid: raw.uid()?,
            info: raw.info(),
            extra: raw.extra(),
        })
    }
}

/// Capability to issue authenticated GETs against the provider API
///
/// The live implementation is [`BearerToken`]; tests substitute ordinary
/// implementations returning canned payloads.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Fetch `path` relative to the provider API base and parse the JSON body
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::UserInfoFailed`] when the request fails or the
    /// body is not JSON.
    async fn get(&self, path: &str) -> Result<Value, OAuthError>;
}

/// Live [`TokenSource`] backed by an access token and the configured site
pub struct BearerToken {
    http: reqwest::Client,
    site: String,
    token: OAuthToken,
}

impl BearerToken {
    /// Create a bearer-auth source for the given site
    #[must_use]
    pub const fn new(http: reqwest::Client, site: String, token: OAuthToken) -> Self {
        Self { http, site, token }
    }

    /// The token this source authenticates with
    #[must_use]
    pub const fn token(&self) -> &OAuthToken {
        &self.token
    }
}

#[async_trait]
impl TokenSource for BearerToken {
    async fn get(&self, path: &str) -> Result<Value, OAuthError> {
        let url = format!("{}{}", self.site, path);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token.access_token)
            .send()
            .await
            .map_err(|e| OAuthError::UserInfoFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OAuthError::UserInfoFailed(format!(
                "HTTP {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| OAuthError::UserInfoFailed(format!("Failed to parse JSON: {e}")))
    }
}

/// Fetch and parse the raw identity for the current access token
///
/// # Errors
///
/// Propagates the source's failure, or [`OAuthError::UserInfoFailed`] when
/// the payload does not match the expected envelope.
pub async fn raw_info(source: &dyn TokenSource) -> Result<RawIdentity, OAuthError> {
    let value = source.get(USER_INFO_PATH).await?;
    RawIdentity::from_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn student_payload() -> RawIdentity {
        RawIdentity::from_value(json!({
            "type": "student",
            "data": {
                "id": "12345",
                "name": "John Doe"
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_uid_returns_data_id() {
        let raw = RawIdentity::from_value(json!({"data": {"id": "12345"}})).unwrap();
        assert_eq!(raw.uid().unwrap(), "12345");
    }

    #[test]
    fn test_uid_missing_id_fails() {
        let raw = RawIdentity::from_value(json!({"data": {"name": "John Doe"}})).unwrap();
        assert!(matches!(raw.uid(), Err(OAuthError::MissingField("data.id"))));
    }

    #[test]
    fn test_info_merges_type_and_data() {
        let info = student_payload().info();
        let expected = json!({
            "user_type": "student",
            "id": "12345",
            "name": "John Doe"
        });
        assert_eq!(Value::Object(info), expected);
    }

    #[test]
    fn test_info_keeps_user_type_key_when_type_absent() {
        let raw = RawIdentity::from_value(json!({"data": {"id": "12345"}})).unwrap();
        let info = raw.info();
        assert_eq!(info.get("user_type"), Some(&Value::Null));
        assert_eq!(info.get("id"), Some(&json!("12345")));
    }

    #[test]
    fn test_extra_retains_raw_payload() {
        let payload = json!({
            "type": "student",
            "data": {"id": "12345", "name": "John Doe"},
            "links": [{"rel": "canonical", "uri": "/v3.0/students/12345"}]
        });
        let raw = RawIdentity::from_value(payload.clone()).unwrap();
        let extra = raw.extra();
        assert_eq!(extra.get("raw_info"), Some(&payload));
    }

    #[test]
    fn test_from_value_rejects_wrong_shape() {
        assert!(RawIdentity::from_value(json!({"data": "not-an-object"})).is_err());
        assert!(RawIdentity::from_value(json!("just a string")).is_err());
    }

    #[test]
    fn test_auth_result_from_raw() {
        let auth = AuthResult::from_raw(&student_payload()).unwrap();
        assert_eq!(auth.provider, "clever");
        assert_eq!(auth.uid, "12345");
        assert_eq!(auth.info.get("name"), Some(&json!("John Doe")));
        assert!(auth.extra.contains_key("raw_info"));
    }

    struct CannedSource(Value);

    #[async_trait]
    impl TokenSource for CannedSource {
        async fn get(&self, path: &str) -> Result<Value, OAuthError> {
            assert_eq!(path, USER_INFO_PATH);
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_raw_info_parses_source_response() {
        let source = CannedSource(json!({"type": "teacher", "data": {"id": "67890"}}));
        let raw = raw_info(&source).await.unwrap();
        assert_eq!(raw.user_type.as_deref(), Some("teacher"));
        assert_eq!(raw.uid().unwrap(), "67890");
    }
}
