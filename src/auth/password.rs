/// Password Hashing and Verification
///
/// Wraps bcrypt with a fixed work factor. Hashing runs on the blocking pool so a
/// slow hash never stalls the async workers.

use bcrypt::{hash, verify};

use crate::error::AppError;

#[derive(Clone, Copy, Debug)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// # Arguments
    /// * `cost` - bcrypt work factor (4..=31)
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a password using bcrypt
    ///
    /// # Errors
    /// Returns `HashFailure` if bcrypt fails; never a weaker fallback hash.
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        hash(password, self.cost).map_err(|e| AppError::HashFailure(Box::new(e)))
    }

    /// Verify a password against its hash.
    ///
    /// A malformed hash and a wrong password both yield `false`.
    pub fn verify(&self, password: &str, password_hash: &str) -> bool {
        match verify(password, password_hash) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash could not be verified");
                false
            }
        }
    }

    pub async fn hash_async(&self, password: &str) -> Result<String, AppError> {
        let hasher = *self;
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::HashFailure(Box::new(e)))?
    }

    pub async fn verify_async(&self, password: &str, password_hash: &str) -> bool {
        let hasher = *self;
        let password = password.to_string();
        let password_hash = password_hash.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &password_hash))
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Password verification task failed");
                false
            })
    }
}
