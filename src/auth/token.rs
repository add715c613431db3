/// Opaque Token Generation
///
/// Single-use bearer tokens for email verification and password reset links,
/// and the CSRF state parameter of the OAuth flow.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};

use crate::error::AppError;

/// 32 bytes = 256 bits of entropy
const TOKEN_BYTES: usize = 32;

/// Email verification links stay valid for 24 hours
pub const VERIFICATION_TOKEN_TTL_HOURS: i64 = 24;
/// Password reset links stay valid for 1 hour
pub const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// Generate a URL-safe random token from the OS entropy source.
///
/// # Errors
/// Returns error if the OS cannot provide randomness. Callers must abort.
pub fn generate_secure_token() -> Result<String, AppError> {
    let mut buffer = [0u8; TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut buffer).map_err(|e| {
        tracing::error!(error = %e, "OS random source unavailable");
        AppError::Internal(format!("failed to obtain randomness: {}", e))
    })?;
    Ok(URL_SAFE_NO_PAD.encode(buffer))
}

/// A generated token together with its absolute expiry
#[derive(Clone, Debug)]
pub struct OneTimeToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl OneTimeToken {
    pub fn generate(validity: Duration) -> Result<Self, AppError> {
        Ok(Self {
            token: generate_secure_token()?,
            expires_at: Utc::now() + validity,
        })
    }

    pub fn verification() -> Result<Self, AppError> {
        Self::generate(Duration::hours(VERIFICATION_TOKEN_TTL_HOURS))
    }

    pub fn password_reset() -> Result<Self, AppError> {
        Self::generate(Duration::hours(RESET_TOKEN_TTL_HOURS))
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// True once `expires_at` has passed. A missing expiry counts as expired.
pub fn has_expired(expires_at: Option<DateTime<Utc>>) -> bool {
    expires_at.map_or(true, |at| Utc::now() > at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique_and_url_safe() {
        let token1 = generate_secure_token().unwrap();
        let token2 = generate_secure_token().unwrap();

        assert_ne!(token1, token2);
        // 32 bytes, base64 without padding
        assert_eq!(token1.len(), 43);
        assert!(token1
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_verification_token_window() {
        let token = OneTimeToken::verification().unwrap();
        let remaining = token.expires_at() - Utc::now();

        assert!(!has_expired(Some(token.expires_at())));
        assert!(remaining > Duration::hours(23));
        assert!(remaining <= Duration::hours(24));
    }

    #[test]
    fn test_reset_token_window() {
        let token = OneTimeToken::password_reset().unwrap();
        let remaining = token.expires_at() - Utc::now();

        assert!(remaining > Duration::minutes(59));
        assert!(remaining <= Duration::hours(1));
    }

    #[test]
    fn test_negative_validity_is_expired() {
        let token = OneTimeToken::generate(Duration::seconds(-1)).unwrap();
        assert!(has_expired(Some(token.expires_at())));
    }

    #[test]
    fn test_has_expired() {
        assert!(has_expired(None));
        assert!(has_expired(Some(Utc::now() - Duration::seconds(1))));
        assert!(!has_expired(Some(Utc::now() + Duration::minutes(5))));
    }
}
