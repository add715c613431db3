/// External identity provider bridge
///
/// The account engine only needs three things from a provider: where to send the
/// browser, how to turn the returned code into a credential, and who that
/// credential belongs to.

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use crate::configuration::OAuthSettings;
use crate::error::OAuthError;

/// Identity claims as reported by the provider
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalIdentity {
    pub external_id: String,
    pub email: String,
    pub name: String,
    pub picture_url: Option<String>,
}

/// Opaque credential obtained from the code exchange
#[derive(Debug, Clone)]
pub struct OAuthCredential {
    pub access_token: String,
}

#[async_trait]
pub trait IdentityBridge: Send + Sync {
    /// Provider name stored on linked accounts, e.g. `"google"`
    fn provider(&self) -> &'static str;

    fn auth_url(&self, state: &str) -> String;

    async fn exchange_code(&self, code: &str) -> Result<OAuthCredential, OAuthError>;

    async fn fetch_identity(&self, credential: &OAuthCredential) -> Result<ExternalIdentity, OAuthError>;
}

#[derive(Clone)]
pub struct GoogleOAuthClient {
    http_client: reqwest::Client,
    settings: OAuthSettings,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct GoogleUserInfo {
    id: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

impl GoogleOAuthClient {
    pub fn new(settings: OAuthSettings) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            settings,
        }
    }
}

impl TryFrom<GoogleUserInfo> for ExternalIdentity {
    type Error = OAuthError;

    fn try_from(info: GoogleUserInfo) -> Result<Self, Self::Error> {
        if info.id.is_empty() {
            return Err(OAuthError::IncompleteProfile("id"));
        }
        let email = info
            .email
            .filter(|e| !e.is_empty())
            .ok_or(OAuthError::IncompleteProfile("email"))?;
        // Fall back to the mailbox name when the profile has no display name
        let name = info
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

        Ok(Self {
            external_id: info.id,
            email,
            name,
            picture_url: info.picture.filter(|p| !p.is_empty()),
        })
    }
}

#[async_trait]
impl IdentityBridge for GoogleOAuthClient {
    fn provider(&self) -> &'static str {
        "google"
    }

    fn auth_url(&self, state: &str) -> String {
        let params = [
            ("client_id", self.settings.google_client_id.as_str()),
            ("redirect_uri", self.settings.google_redirect_url.as_str()),
            ("response_type", "code"),
            ("scope", "openid email profile"),
            ("access_type", "offline"),
            ("state", state),
        ];
        match Url::parse_with_params(&self.settings.auth_url, &params) {
            Ok(url) => url.into(),
            Err(e) => {
                tracing::error!(error = %e, "Invalid OAuth authorization endpoint");
                self.settings.auth_url.clone()
            }
        }
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthCredential, OAuthError> {
        let form = [
            ("code", code),
            ("client_id", self.settings.google_client_id.as_str()),
            ("client_secret", self.settings.google_client_secret.as_str()),
            ("redirect_uri", self.settings.google_redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let token: TokenResponse = self
            .http_client
            .post(&self.settings.token_url)
            .form(&form)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(OAuthError::CodeExchange)?
            .json()
            .await
            .map_err(OAuthError::CodeExchange)?;

        Ok(OAuthCredential {
            access_token: token.access_token,
        })
    }

    async fn fetch_identity(&self, credential: &OAuthCredential) -> Result<ExternalIdentity, OAuthError> {
        let info: GoogleUserInfo = self
            .http_client
            .get(&self.settings.userinfo_url)
            .bearer_auth(&credential.access_token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(OAuthError::UserInfo)?
            .json()
            .await
            .map_err(OAuthError::UserInfo)?;

        ExternalIdentity::try_from(info)
    }
}
