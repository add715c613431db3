/// Refresh Token Management
///
/// Persistence and validity bookkeeping for issued refresh tokens:
/// - Only the SHA-256 digest of a token is handed to the store (never the plaintext)
/// - Revocation marks a record, it never deletes it
/// - Validation tells "unknown", "revoked" and "expired" apart

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::RefreshToken;
use crate::error::AppError;
use crate::store::RefreshTokenStore;

/// Hash a refresh token using SHA-256
pub(crate) fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Clone)]
pub struct RefreshTokenService {
    store: Arc<dyn RefreshTokenStore>,
}

impl RefreshTokenService {
    pub fn new(store: Arc<dyn RefreshTokenStore>) -> Self {
        Self { store }
    }

    /// Persist a freshly issued token
    ///
    /// # Arguments
    /// * `user_id` - User ID that owns this token
    /// * `token` - Plaintext refresh token
    /// * `expires_at` - Absolute expiry of the record
    pub async fn create(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, AppError> {
        let record = RefreshToken::new(user_id, hash_token(token), expires_at);
        self.store.create(&record).await?;
        Ok(record)
    }

    /// Look up a token and make sure it can still be used
    ///
    /// # Errors
    /// * `NotFound` - never issued (or already swept)
    /// * `TokenRevoked` - revoked by logout or rotation
    /// * `TokenExpired` - past its absolute expiry
    pub async fn validate(&self, token: &str) -> Result<RefreshToken, AppError> {
        let record = self
            .store
            .get_by_token(&hash_token(token))
            .await?
            .ok_or_else(|| {
                tracing::warn!("Refresh token not found");
                AppError::NotFound("refresh token")
            })?;

        if record.is_revoked() {
            tracing::warn!(user_id = %record.user_id, "Attempt to use revoked refresh token");
            return Err(AppError::TokenRevoked);
        }

        if record.is_expired() {
            tracing::info!(user_id = %record.user_id, "Refresh token expired");
            return Err(AppError::TokenExpired);
        }

        Ok(record)
    }

    /// Revoke a single token. Returns `false` when it was unknown or someone
    /// else revoked it first.
    pub async fn revoke(&self, token: &str) -> Result<bool, AppError> {
        self.store.revoke(&hash_token(token)).await
    }

    /// Revoke every outstanding token of a user
    pub async fn revoke_all(&self, user_id: Uuid) -> Result<u64, AppError> {
        let revoked = self.store.revoke_all_for_user(user_id).await?;
        tracing::info!(user_id = %user_id, revoked, "All refresh tokens revoked for user");
        Ok(revoked)
    }

    pub async fn list_valid(&self, user_id: Uuid) -> Result<Vec<RefreshToken>, AppError> {
        self.store.list_valid_for_user(user_id).await
    }

    /// Maintenance sweep; kept off the request path
    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        let removed = self.store.delete_expired().await?;
        if removed > 0 {
            tracing::info!(removed, "Expired refresh tokens purged");
        }
        Ok(removed)
    }
}
