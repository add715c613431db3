use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::OneTimeToken;

/// A user account.
///
/// Every account holds a password hash, a linked OAuth identity, or both.
/// The constructors are the only way to create one, so a fresh record always
/// satisfies that; later mutations only ever add a credential.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: Option<String>,
    pub name: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub oauth_provider: Option<String>,
    pub oauth_id: Option<String>,
    pub email_verified: bool,
    pub verification_token: Option<String>,
    pub verification_token_expires_at: Option<DateTime<Utc>>,
    pub reset_token: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// New password account, unverified until the email link is followed
    pub fn with_password(
        email: String,
        password_hash: String,
        name: String,
        phone: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash: Some(password_hash),
            name,
            phone,
            avatar_url: None,
            oauth_provider: None,
            oauth_id: None,
            email_verified: false,
            verification_token: None,
            verification_token_expires_at: None,
            reset_token: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// New OAuth-only account. The provider has already verified the address.
    pub fn with_oauth(
        email: String,
        name: String,
        avatar_url: Option<String>,
        provider: &str,
        oauth_id: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash: None,
            name,
            phone: None,
            avatar_url,
            oauth_provider: Some(provider.to_string()),
            oauth_id: Some(oauth_id),
            email_verified: true,
            verification_token: None,
            verification_token_expires_at: None,
            reset_token: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// True when both halves of an OAuth identity are present
    pub fn is_oauth_user(&self) -> bool {
        self.oauth_provider.is_some() && self.oauth_id.is_some()
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// OAuth-only: no password to log in with or reset
    pub fn is_oauth_only(&self) -> bool {
        !self.has_password()
    }

    pub fn set_verification_token(&mut self, token: &OneTimeToken) {
        self.verification_token = Some(token.token().to_string());
        self.verification_token_expires_at = Some(token.expires_at());
        self.touch();
    }

    /// Flip to verified and consume the verification token in the same step
    pub fn mark_email_verified(&mut self) {
        self.email_verified = true;
        self.verification_token = None;
        self.verification_token_expires_at = None;
        self.touch();
    }

    pub fn set_reset_token(&mut self, token: &OneTimeToken) {
        self.reset_token = Some(token.token().to_string());
        self.reset_token_expires_at = Some(token.expires_at());
        self.touch();
    }

    /// Replace the password and consume the reset token in the same step
    pub fn replace_password(&mut self, password_hash: String) {
        self.password_hash = Some(password_hash);
        self.reset_token = None;
        self.reset_token_expires_at = None;
        self.touch();
    }

    /// Attach an external identity, keeping any existing avatar
    pub fn link_oauth(&mut self, provider: &str, oauth_id: String, avatar_url: Option<String>) {
        self.oauth_provider = Some(provider.to_string());
        self.oauth_id = Some(oauth_id);
        if self.avatar_url.is_none() {
            self.avatar_url = avatar_url;
        }
        self.touch();
    }

    pub fn update_profile(&mut self, name: String, phone: Option<String>) {
        self.name = name;
        self.phone = phone;
        self.touch();
    }

    pub fn set_avatar_url(&mut self, avatar_url: String) {
        self.avatar_url = Some(avatar_url);
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
