/// Session issuance, refresh rotation and logout
///
/// A refresh succeeds only when the presented token passes all of:
/// 1. JWT signature, type (`refresh`) and expiry checks
/// 2. The store has it, unrevoked and unexpired
/// 3. The user ID inside the JWT owns the store record
///
/// The store check is what makes logout effective before the JWT itself expires.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::claims::{Claims, TokenType};
use crate::auth::jwt::JwtService;
use crate::auth::refresh_token::RefreshTokenService;
use crate::domain::RefreshToken;
use crate::error::AppError;

/// Access + refresh pair handed to the client
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

#[derive(Clone)]
pub struct SessionService {
    jwt: JwtService,
    refresh_tokens: RefreshTokenService,
}

impl SessionService {
    pub fn new(jwt: JwtService, refresh_tokens: RefreshTokenService) -> Self {
        Self { jwt, refresh_tokens }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    pub fn refresh_tokens(&self) -> &RefreshTokenService {
        &self.refresh_tokens
    }

    /// Check an access token (the bearer credential on protected routes)
    pub fn authenticate(&self, access_token: &str) -> Result<Claims, AppError> {
        self.jwt.validate(access_token, TokenType::Access)
    }

    /// Issue a new pair and persist the refresh half
    pub async fn start(&self, user_id: Uuid) -> Result<TokenPair, AppError> {
        let access_token = self.jwt.issue_access_token(user_id)?;
        let refresh_token = self.jwt.issue_refresh_token(user_id)?;

        let expires_at = Utc::now() + self.jwt.refresh_token_ttl();
        self.refresh_tokens
            .create(user_id, &refresh_token, expires_at)
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.access_token_ttl().num_seconds(),
        })
    }

    /// Exchange a refresh token for a new pair (single-use rotation).
    ///
    /// Only the presented token is revoked; the user's other sessions stay valid.
    ///
    /// # Errors
    /// * `InvalidToken` / `TokenExpired` - JWT checks failed
    /// * `NotFound` / `TokenRevoked` / `TokenExpired` - store checks failed
    /// * `InvalidToken` - JWT subject does not own the store record
    pub async fn refresh(&self, presented: &str) -> Result<(Uuid, TokenPair), AppError> {
        let claims = self.jwt.validate(presented, TokenType::Refresh)?;
        let user_id = claims.user_id()?;

        let record = self.refresh_tokens.validate(presented).await?;
        if record.user_id != user_id {
            tracing::warn!(
                claimed_user = %user_id,
                owner = %record.user_id,
                "Refresh token presented for a different user"
            );
            return Err(AppError::InvalidToken);
        }

        // Revoke first: a failure below leaves the user logged out, never with two live tokens.
        // Only the caller whose revoke flipped the record may mint the next pair.
        if !self.refresh_tokens.revoke(presented).await? {
            tracing::warn!(user_id = %user_id, "Refresh token was consumed concurrently");
            return Err(AppError::TokenRevoked);
        }
        let pair = self.start(user_id).await?;

        tracing::info!(user_id = %user_id, "Token refreshed successfully");
        Ok((user_id, pair))
    }

    /// Log the user out everywhere: every outstanding refresh token is revoked
    pub async fn logout(&self, user_id: Uuid) -> Result<(), AppError> {
        self.refresh_tokens.revoke_all(user_id).await?;
        Ok(())
    }

    pub async fn active_sessions(&self, user_id: Uuid) -> Result<Vec<RefreshToken>, AppError> {
        self.refresh_tokens.list_valid(user_id).await
    }
}
