//! Shared test harness: the real HTTP stack over in-memory stores, with a
//! recording email sender and a scripted identity provider.

#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use account_service::accounts::AccountService;
use account_service::auth::{JwtService, PasswordHasher, RefreshTokenService, SessionService};
use account_service::configuration::JwtSettings;
use account_service::email_client::NotificationSender;
use account_service::error::{EmailError, OAuthError};
use account_service::oauth::{ExternalIdentity, IdentityBridge, OAuthCredential};
use account_service::startup::run;
use account_service::store::{InMemoryRefreshTokenStore, InMemoryUserStore};
use async_trait::async_trait;
use serde_json::{json, Value};

pub const PASSWORD: &str = "pw12345678";

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

    /// Latest verification token mailed to `to`, waiting for background sends
    pub async fn verification_token_for(&self, to: &str) -> String {
        self.wait_for_token(|email| match email {
            SentEmail::Verification { to: t, token } if t == to => Some(token.clone()),
            _ => None,
        })
        .await
    }

    /// Latest reset token mailed to `to`, waiting for background sends
    pub async fn reset_token_for(&self, to: &str) -> String {
        self.wait_for_token(|email| match email {
            SentEmail::PasswordReset { to: t, token } if t == to => Some(token.clone()),
            _ => None,
        })
        .await
    }

    async fn wait_for_token(&self, pick: impl Fn(&SentEmail) -> Option<String>) -> String {
        for _ in 0..200 {
            if let Some(token) = self.sent().iter().rev().find_map(&pick) {
                return token;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no matching email was sent");
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

/// Identity provider double: any code yields the scripted identity
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

pub fn google_identity(external_id: &str, email: &str) -> ExternalIdentity {
    ExternalIdentity {
        external_id: external_id.to_string(),
        email: email.to_string(),
        name: "Google User".to_string(),
        picture_url: Some("https://img.test/avatar.png".to_string()),
    }
}

pub fn jwt_settings() -> JwtSettings {
    JwtSettings {
        secret: "integration-test-secret-with-enough-length".to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 604800,
        issuer: "account_service_test".to_string(),
    }
}

/// Engine and session layer wired to in-memory collaborators
pub struct Services {
    pub accounts: AccountService,
    pub sessions: SessionService,
    pub users: Arc<InMemoryUserStore>,
    pub refresh_store: Arc<InMemoryRefreshTokenStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub bridge: Arc<StubIdentityBridge>,
}

pub fn services() -> Services {
    let users = Arc::new(InMemoryUserStore::new());
    let refresh_store = Arc::new(InMemoryRefreshTokenStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let bridge = Arc::new(StubIdentityBridge::default());

    let accounts = AccountService::new(
        users.clone(),
        PasswordHasher::new(4),
        notifier.clone(),
        bridge.clone(),
    );
    let sessions = SessionService::new(
        JwtService::new(&jwt_settings()),
        RefreshTokenService::new(refresh_store.clone()),
    );

    Services {
        accounts,
        sessions,
        users,
        refresh_store,
        notifier,
        bridge,
    }
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub services: Services,
}

pub fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let services = services();
    let server = run(listener, services.accounts.clone(), services.sessions.clone())
        .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client,
        services,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get_authed(&self, path: &str, access_token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(access_token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn register(&self, email: &str) -> reqwest::Response {
        self.post_json(
            "/auth/register",
            &json!({ "email": email, "password": PASSWORD, "name": "Test User", "phone": "000" }),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_json("/auth/login", &json!({ "email": email, "password": password }))
            .await
    }

    /// Register, follow the emailed link, log in. Returns the login body.
    pub async fn verified_user(&self, email: &str) -> Value {
        assert_eq!(self.register(email).await.status().as_u16(), 201);
        let token = self.services.notifier.verification_token_for(email).await;

        let response = self
            .post_json("/auth/verify-email", &json!({ "token": token }))
            .await;
        assert_eq!(response.status().as_u16(), 200);

        let response = self.login(email, PASSWORD).await;
        assert_eq!(response.status().as_u16(), 200);
        response.json().await.expect("Failed to parse login response")
    }
}
