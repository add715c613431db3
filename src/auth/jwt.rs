/// JWT Token Generation and Validation
///
/// Issues and validates HS256-signed access and refresh tokens. The token type is
/// part of the signed payload, so an access token can never pass where a refresh
/// token is expected (and vice versa), whatever route it arrives on.

use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::{Claims, TokenType};
use crate::configuration::JwtSettings;
use crate::error::AppError;

const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
    issuer: String,
}

impl JwtService {
    pub fn new(config: &JwtSettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            access_token_expiry: config.access_token_expiry,
            refresh_token_expiry: config.refresh_token_expiry,
            issuer: config.issuer.clone(),
        }
    }

    /// # Errors
    /// Returns error if token signing fails
    pub fn issue_access_token(&self, user_id: Uuid) -> Result<String, AppError> {
        self.issue(user_id, TokenType::Access, self.access_token_expiry)
    }

    /// # Errors
    /// Returns error if token signing fails
    pub fn issue_refresh_token(&self, user_id: Uuid) -> Result<String, AppError> {
        self.issue(user_id, TokenType::Refresh, self.refresh_token_expiry)
    }

    fn issue(&self, user_id: Uuid, token_type: TokenType, expiry: i64) -> Result<String, AppError> {
        let claims = Claims::new(user_id, token_type, expiry, self.issuer.clone());

        encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Validate a token and return its claims.
    ///
    /// Only HS256 is accepted; a header naming any other algorithm (including
    /// `none`) is rejected before the signature is looked at.
    ///
    /// # Errors
    /// * `InvalidToken` - bad signature, malformed claims, wrong issuer or wrong type
    /// * `TokenExpired` - otherwise valid, but past `exp`
    pub fn validate(&self, token: &str, expected: TokenType) -> Result<Claims, AppError> {
        let mut validation = Validation::new(ALGORITHM);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "nbf", "iat", "sub", "iss"]);
        validation.validate_nbf = true;
        // Expiry is checked below so it can be reported separately
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::warn!(error = %e, "JWT validation error");
                AppError::InvalidToken
            })?;

        if claims.token_type != expected {
            tracing::warn!(
                expected = %expected,
                presented = %claims.token_type,
                "JWT presented with the wrong token type"
            );
            return Err(AppError::InvalidToken);
        }

        if claims.is_expired() {
            return Err(AppError::TokenExpired);
        }

        Ok(claims)
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::seconds(self.access_token_expiry)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::seconds(self.refresh_token_expiry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

    fn get_test_config() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
            issuer: "test".to_string(),
        }
    }

    fn service() -> JwtService {
        JwtService::new(&get_test_config())
    }

    #[test]
    fn test_issue_and_validate_access_token() {
        let user_id = Uuid::new_v4();
        let token = service().issue_access_token(user_id).unwrap();
        let claims = service().validate(&token, TokenType::Access).unwrap();

        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.iss, "test");
    }

    #[test]
    fn test_access_token_rejected_as_refresh() {
        let token = service().issue_access_token(Uuid::new_v4()).unwrap();
        let result = service().validate(&token, TokenType::Refresh);
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_refresh_token_rejected_as_access() {
        let token = service().issue_refresh_token(Uuid::new_v4()).unwrap();
        assert!(service().validate(&token, TokenType::Refresh).is_ok());
        let result = service().validate(&token, TokenType::Access);
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_reports_expired() {
        let mut config = get_test_config();
        config.access_token_expiry = -120;
        let expired = JwtService::new(&config);

        let token = expired.issue_access_token(Uuid::new_v4()).unwrap();
        let result = expired.validate(&token, TokenType::Access);
        assert!(matches!(result, Err(AppError::TokenExpired)));
    }

    #[test]
    fn test_invalid_token() {
        let result = service().validate("invalid.token.here", TokenType::Access);
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_tampered_token() {
        let token = service().issue_access_token(Uuid::new_v4()).unwrap();
        let tampered = format!("{}X", token);
        assert!(matches!(
            service().validate(&tampered, TokenType::Access),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_wrong_secret() {
        let token = service().issue_access_token(Uuid::new_v4()).unwrap();
        let mut config = get_test_config();
        config.secret = "another-secret-key-at-least-32-characters".to_string();
        assert!(matches!(
            JwtService::new(&config).validate(&token, TokenType::Access),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_wrong_issuer() {
        let token = service().issue_access_token(Uuid::new_v4()).unwrap();
        let mut config = get_test_config();
        config.issuer = "wrong-issuer".to_string();
        assert!(JwtService::new(&config)
            .validate(&token, TokenType::Access)
            .is_err());
    }

    #[test]
    fn test_none_algorithm_rejected() {
        let claims = Claims::new(Uuid::new_v4(), TokenType::Access, 900, "test".to_string());
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let unsigned = format!("{}.{}.", header, payload);

        assert!(matches!(
            service().validate(&unsigned, TokenType::Access),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_other_hmac_algorithm_rejected() {
        let config = get_test_config();
        let claims = Claims::new(Uuid::new_v4(), TokenType::Access, 900, "test".to_string());
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            service().validate(&token, TokenType::Access),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_ttl_accessors() {
        assert_eq!(service().access_token_ttl(), Duration::minutes(15));
        assert_eq!(service().refresh_token_ttl(), Duration::days(7));
    }
}
