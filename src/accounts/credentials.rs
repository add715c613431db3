use crate::accounts::{dispatch_email, AccountService};
use crate::auth::{has_expired, OneTimeToken};
use crate::domain::User;
use crate::error::AppError;

impl AccountService {
    /// Create a password account and send the verification link.
    ///
    /// The email pre-check is best effort; the store's unique constraint is what
    /// actually settles concurrent signups for the same address.
    ///
    /// # Errors
    /// * `AlreadyExists` - email already registered
    /// * `HashFailure` - bcrypt failed
    pub async fn register(
        &self,
        email: String,
        password: &str,
        name: String,
        phone: Option<String>,
    ) -> Result<User, AppError> {
        if self.users.get_by_email(&email).await?.is_some() {
            tracing::warn!(email = %email, "Registration attempt for existing email");
            return Err(AppError::AlreadyExists("user with this email already exists"));
        }

        let password_hash = self.hasher.hash_async(password).await?;
        let verification = OneTimeToken::verification()?;

        let mut user = User::with_password(email, password_hash, name, phone);
        user.set_verification_token(&verification);
        self.users.create(&user).await?;

        tracing::info!(user_id = %user.id, "User registered successfully");

        let notifier = self.notifier.clone();
        let (to, name) = (user.email.clone(), user.name.clone());
        let token = verification.token().to_string();
        dispatch_email("verification", user.id, async move {
            notifier.send_verification_email(&to, &name, &token).await
        });

        Ok(user)
    }

    /// Check credentials.
    ///
    /// Unknown email and wrong password are the same `InvalidCredentials`. The
    /// verification gate is only reached after the password matched.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AppError> {
        let user = self
            .users
            .get_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_hash = match (&user.password_hash, &user.oauth_provider) {
            (Some(hash), _) => hash,
            (None, provider) => {
                return Err(AppError::OAuthAccount {
                    provider: provider.clone().unwrap_or_else(|| "social".to_string()),
                })
            }
        };

        if !self.hasher.verify_async(password, password_hash).await {
            tracing::warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(AppError::InvalidCredentials);
        }

        if !user.email_verified {
            return Err(AppError::EmailNotVerified);
        }

        tracing::info!(user_id = %user.id, "User logged in successfully");
        Ok(user)
    }

    /// Consume a verification token. Verifying an already verified account is a no-op.
    ///
    /// # Errors
    /// * `InvalidVerificationToken` - nobody holds this token
    /// * `VerificationTokenExpired` - the 24 hour window has passed
    pub async fn verify_email(&self, token: &str) -> Result<User, AppError> {
        let mut user = self
            .users
            .get_by_verification_token(token)
            .await?
            .ok_or(AppError::InvalidVerificationToken)?;

        if has_expired(user.verification_token_expires_at) {
            return Err(AppError::VerificationTokenExpired);
        }

        if user.email_verified {
            return Ok(user);
        }

        user.mark_email_verified();
        self.users.update(&user).await?;

        tracing::info!(user_id = %user.id, "Email verified");
        Ok(user)
    }

    /// Mint a fresh verification token (replacing any earlier one) and send it.
    ///
    /// Unlike the other notifications, a delivery failure is reported to the caller.
    pub async fn resend_verification_email(&self, email: &str) -> Result<(), AppError> {
        let mut user = self
            .users
            .get_by_email(email)
            .await?
            .ok_or(AppError::NotFound("user"))?;

        if user.email_verified {
            return Err(AppError::EmailAlreadyVerified);
        }

        let verification = OneTimeToken::verification()?;
        user.set_verification_token(&verification);
        self.users.update(&user).await?;

        self.notifier
            .send_verification_email(&user.email, &user.name, verification.token())
            .await?;

        tracing::info!(user_id = %user.id, "Verification email resent");
        Ok(())
    }

    /// Start a password reset.
    ///
    /// Never fails: unknown emails, OAuth-only accounts and internal errors all
    /// look the same to the caller.
    pub async fn forgot_password(&self, email: &str) {
        if let Err(e) = self.issue_reset_token(email).await {
            tracing::error!(error = %e.chain(), "Password reset request failed");
        }
    }

    async fn issue_reset_token(&self, email: &str) -> Result<(), AppError> {
        let mut user = match self.users.get_by_email(email).await? {
            Some(user) => user,
            None => {
                tracing::info!("Password reset requested for unknown email");
                return Ok(());
            }
        };

        if user.is_oauth_only() {
            tracing::info!(user_id = %user.id, "Password reset skipped for OAuth-only account");
            return Ok(());
        }

        let reset = OneTimeToken::password_reset()?;
        user.set_reset_token(&reset);
        self.users.update(&user).await?;

        tracing::info!(user_id = %user.id, "Password reset token issued");

        let notifier = self.notifier.clone();
        let (to, name) = (user.email.clone(), user.name.clone());
        let token = reset.token().to_string();
        dispatch_email("password_reset", user.id, async move {
            notifier.send_password_reset_email(&to, &name, &token).await
        });

        Ok(())
    }

    /// Set a new password with a reset token; the token is consumed by the same update.
    ///
    /// # Errors
    /// * `InvalidResetToken` - nobody holds this token
    /// * `ResetTokenExpired` - the 1 hour window has passed
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AppError> {
        let user = self
            .users
            .get_by_reset_token(token)
            .await?
            .ok_or(AppError::InvalidResetToken)?;

        if has_expired(user.reset_token_expires_at) {
            return Err(AppError::ResetTokenExpired);
        }

        let password_hash = self.hasher.hash_async(new_password).await?;
        if !self.users.consume_reset_token(token, &password_hash).await? {
            tracing::warn!(user_id = %user.id, "Reset token was consumed concurrently");
            return Err(AppError::InvalidResetToken);
        }

        tracing::info!(user_id = %user.id, "Password reset completed");
        Ok(())
    }
}
