/// Storage interfaces
///
/// The account engine and session layer only see these traits. Lookups that miss
/// return `Ok(None)`, which keeps "not there" apart from transport failures.
/// Uniqueness (email, provider + external id, token digests) is enforced by the
/// store itself and surfaces as `AppError::AlreadyExists`.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{RefreshToken, User};
use crate::error::AppError;

mod memory;
mod postgres;

pub use memory::{InMemoryRefreshTokenStore, InMemoryUserStore};
pub use postgres::{PgRefreshTokenStore, PgUserStore};

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: &User) -> Result<(), AppError>;
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn get_by_oauth_id(
        &self,
        provider: &str,
        external_id: &str,
    ) -> Result<Option<User>, AppError>;
    async fn get_by_verification_token(&self, token: &str) -> Result<Option<User>, AppError>;
    async fn get_by_reset_token(&self, token: &str) -> Result<Option<User>, AppError>;
    /// Set a new password hash and clear the reset token, but only while the
    /// account still holds `token`. Returns `false` if the token was already consumed.
    async fn consume_reset_token(&self, token: &str, password_hash: &str) -> Result<bool, AppError>;
    /// Overwrite every mutable column. `NotFound` if the user is gone.
    async fn update(&self, user: &User) -> Result<(), AppError>;
    /// `NotFound` if the user does not exist
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
    /// Oldest first
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, AppError>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn create(&self, token: &RefreshToken) -> Result<(), AppError>;
    async fn get_by_token(&self, token_hash: &str) -> Result<Option<RefreshToken>, AppError>;
    /// Unrevoked, unexpired records only
    async fn list_valid_for_user(&self, user_id: Uuid) -> Result<Vec<RefreshToken>, AppError>;
    /// Returns `true` only for the call that actually flipped the record.
    /// An already revoked record keeps its original timestamp.
    async fn revoke(&self, token_hash: &str) -> Result<bool, AppError>;
    /// Idempotent; returns how many records were newly revoked
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError>;
    /// Returns how many records were removed
    async fn delete_expired(&self) -> Result<u64, AppError>;
}
