use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::accounts::AccountService;
use crate::auth::PasswordHasher;
use crate::email_client::NotificationSender;
use crate::error::{EmailError, OAuthError};
use crate::oauth::{ExternalIdentity, IdentityBridge, OAuthCredential};
use crate::store::InMemoryUserStore;

#[derive(Debug, Clone, PartialEq)]
pub enum SentEmail {
    Verification { to: String, token: String },
    PasswordReset { to: String, token: String },
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentEmail>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn fail_sends(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// Background sends land on another task; poll until `count` arrived or 2s passed
    pub async fn wait_for(&self, count: usize) -> Vec<SentEmail> {
        for _ in 0..200 {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.sent()
    }

    fn record(&self, email: SentEmail) -> Result<(), EmailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmailError::InvalidLink("email service down".to_string()));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

#[async_trait]
impl NotificationSender for RecordingNotifier {
    async fn send_verification_email(&self, to: &str, _name: &str, token: &str) -> Result<(), EmailError> {
        self.record(SentEmail::Verification {
            to: to.to_string(),
            token: token.to_string(),
        })
    }

    async fn send_password_reset_email(&self, to: &str, _name: &str, token: &str) -> Result<(), EmailError> {
        self.record(SentEmail::PasswordReset {
            to: to.to_string(),
            token: token.to_string(),
        })
    }
}

/// Returns whatever identity the test configured, for any code
#[derive(Default)]
pub struct StubIdentityBridge {
    identity: Mutex<Option<ExternalIdentity>>,
}

impl StubIdentityBridge {
    pub fn will_return(&self, identity: ExternalIdentity) {
        *self.identity.lock().unwrap() = Some(identity);
    }
}

#[async_trait]
impl IdentityBridge for StubIdentityBridge {
    fn provider(&self) -> &'static str {
        "google"
    }

    fn auth_url(&self, state: &str) -> String {
        format!("https://idp.test/auth?state={}", state)
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthCredential, OAuthError> {
        Ok(OAuthCredential {
            access_token: format!("access-for-{}", code),
        })
    }

    async fn fetch_identity(&self, _credential: &OAuthCredential) -> Result<ExternalIdentity, OAuthError> {
        self.identity
            .lock()
            .unwrap()
            .clone()
            .ok_or(OAuthError::IncompleteProfile("email"))
    }
}

pub struct Harness {
    pub accounts: AccountService,
    pub users: Arc<InMemoryUserStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub bridge: Arc<StubIdentityBridge>,
}

pub fn harness() -> Harness {
    let users = Arc::new(InMemoryUserStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let bridge = Arc::new(StubIdentityBridge::default());
    let accounts = AccountService::new(
        users.clone(),
        PasswordHasher::new(4),
        notifier.clone(),
        bridge.clone(),
    );
    Harness {
        accounts,
        users,
        notifier,
        bridge,
    }
}

pub fn google_identity(external_id: &str, email: &str) -> ExternalIdentity {
    ExternalIdentity {
        external_id: external_id.to_string(),
        email: email.to_string(),
        name: "Google User".to_string(),
        picture_url: Some("https://img.test/avatar.png".to_string()),
    }
}
