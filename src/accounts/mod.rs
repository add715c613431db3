/// Account Lifecycle
///
/// Registration, login gating, email verification, password reset, OAuth
/// linking and profile management. The engine works on domain entities and the
/// store / notifier / identity-provider traits only; it never sees HTTP or SQL.
///
/// Email delivery is fire-and-forget: a failed send is logged and never undoes
/// the account change that triggered it (resend-verification is the exception,
/// where the send is the whole point of the call).

use std::future::Future;
use std::sync::Arc;

use uuid::Uuid;

use crate::auth::PasswordHasher;
use crate::domain::User;
use crate::email_client::NotificationSender;
use crate::error::{AppError, EmailError};
use crate::oauth::IdentityBridge;
use crate::store::UserStore;

mod credentials;
mod identity;
mod profile;

#[cfg(test)]
mod fakes;

pub use identity::OAuthAuthorization;

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    notifier: Arc<dyn NotificationSender>,
    identity: Arc<dyn IdentityBridge>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: PasswordHasher,
        notifier: Arc<dyn NotificationSender>,
        identity: Arc<dyn IdentityBridge>,
    ) -> Self {
        Self {
            users,
            hasher,
            notifier,
            identity,
        }
    }

    /// Fetch a user that must exist
    async fn require_user(&self, user_id: Uuid) -> Result<User, AppError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound("user"))
    }
}

/// Run an email send in the background. Failures are logged, nothing awaits the result.
fn dispatch_email<F>(kind: &'static str, user_id: Uuid, send: F)
where
    F: Future<Output = Result<(), EmailError>> + Send + 'static,
{
    tokio::spawn(async move {
        match send.await {
            Ok(()) => tracing::info!(user_id = %user_id, kind, "Email sent"),
            Err(e) => tracing::error!(
                user_id = %user_id,
                kind,
                error = %AppError::from(e).chain(),
                "Failed to send email"
            ),
        }
    });
}
