use serde::Serialize;

use crate::accounts::AccountService;
use crate::auth::generate_secure_token;
use crate::domain::User;
use crate::error::AppError;
use crate::oauth::ExternalIdentity;

/// Where to send the browser, plus the CSRF state the callback must echo back
#[derive(Debug, Clone, Serialize)]
pub struct OAuthAuthorization {
    pub auth_url: String,
    pub state: String,
}

impl AccountService {
    pub fn oauth_authorization(&self) -> Result<OAuthAuthorization, AppError> {
        let state = generate_secure_token()?;
        Ok(OAuthAuthorization {
            auth_url: self.identity.auth_url(&state),
            state,
        })
    }

    /// Exchange the provider's authorization code and resolve the account it belongs to
    pub async fn handle_oauth_callback(&self, code: &str) -> Result<User, AppError> {
        let credential = self.identity.exchange_code(code).await?;
        let identity = self.identity.fetch_identity(&credential).await?;
        self.resolve_oauth_identity(identity).await
    }

    /// Find or create the account for a provider identity, in priority order:
    /// 1. already linked by provider + external id: returned unchanged
    /// 2. same email, not linked yet: linked in place (avatar backfilled if missing)
    /// 3. otherwise a new OAuth-only account
    ///
    /// # Errors
    /// * `AlreadyExists` - the email belongs to an account linked to a different external id
    pub async fn resolve_oauth_identity(&self, identity: ExternalIdentity) -> Result<User, AppError> {
        let provider = self.identity.provider();

        if let Some(user) = self
            .users
            .get_by_oauth_id(provider, &identity.external_id)
            .await?
        {
            tracing::info!(user_id = %user.id, provider, "OAuth login for linked account");
            return Ok(user);
        }

        if let Some(mut user) = self.users.get_by_email(&identity.email).await? {
            if user.is_oauth_user() {
                tracing::warn!(
                    user_id = %user.id,
                    provider,
                    "Email already linked to a different external identity"
                );
                return Err(AppError::AlreadyExists(
                    "email is already linked to another external account",
                ));
            }

            user.link_oauth(provider, identity.external_id, identity.picture_url);
            self.users.update(&user).await?;
            tracing::info!(user_id = %user.id, provider, "OAuth identity linked to existing account");
            return Ok(user);
        }

        let user = User::with_oauth(
            identity.email,
            identity.name,
            identity.picture_url,
            provider,
            identity.external_id,
        );
        self.users.create(&user).await?;
        tracing::info!(user_id = %user.id, provider, "Account created from OAuth login");
        Ok(user)
    }
}
