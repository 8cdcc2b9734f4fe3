//! Anti-CSRF state tokens
//!
//! The authorization redirect stores a freshly generated token in the host
//! session; the callback compares it against the `state` query parameter.
//! Clever never enforces the comparison (see
//! [`crate::CleverSettings::provider_ignores_state`]), but the validator stays
//! general so stricter providers can reuse it.

use rand::Rng;

use crate::types::OAuthError;

/// Session key the generated state token is stored under between the
/// authorization redirect and the callback
pub const STATE_SESSION_KEY: &str = "oauth2.state";

/// Generate an opaque state token
///
/// 32 bytes from a cryptographically secure generator, hex-encoded.
#[must_use]
pub fn generate() -> String {
    let random_bytes: [u8; 32] = rand::rng().random();
    hex::encode(random_bytes)
}

/// Compare the stored and incoming state tokens
///
/// With `enforce` off this always succeeds, whatever the values. With it on,
/// an absent side or a mismatch is treated as a forged callback.
///
/// # Errors
///
/// Returns [`OAuthError::CsrfDetected`] when enforcement is on and the tokens
/// do not match.
pub fn validate(
    stored: Option<&str>,
    incoming: Option<&str>,
    enforce: bool,
) -> Result<(), OAuthError> {
    if !enforce {
        return Ok(());
    }

    match (stored, incoming) {
        (Some(expected), Some(received)) if expected == received => Ok(()),
        _ => Err(OAuthError::CsrfDetected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_produces_64_hex_chars() {
        let token = generate();
        assert_eq!(token.len(), 64); // 32 bytes encoded as hex
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_is_unique_per_call() {
        assert_ne!(generate(), generate());
    }

    #[test]
    fn test_validate_skipped_when_not_enforced() {
        assert!(validate(Some("state123"), Some("state456"), false).is_ok());
        assert!(validate(None, Some("state456"), false).is_ok());
        assert!(validate(None, None, false).is_ok());
    }

    #[test]
    fn test_validate_accepts_matching_tokens() {
        assert!(validate(Some("state123"), Some("state123"), true).is_ok());
    }

    #[test]
    fn test_validate_rejects_mismatch() {
        let result = validate(Some("state123"), Some("state456"), true);
        assert!(matches!(result, Err(OAuthError::CsrfDetected)));
    }

    #[test]
    fn test_validate_rejects_absent_sides() {
        assert!(matches!(
            validate(None, Some("state456"), true),
            Err(OAuthError::CsrfDetected)
        ));
        assert!(matches!(
            validate(Some("state123"), None, true),
            Err(OAuthError::CsrfDetected)
        ));
        assert!(matches!(validate(None, None, true), Err(OAuthError::CsrfDetected)));
    }
}
