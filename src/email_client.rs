use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;

use crate::configuration::EmailSettings;
use crate::error::EmailError;
use crate::validators::escape_html;

/// Outbound account notifications
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_verification_email(
        &self,
        to: &str,
        name: &str,
        token: &str,
    ) -> Result<(), EmailError>;

    async fn send_password_reset_email(
        &self,
        to: &str,
        name: &str,
        token: &str,
    ) -> Result<(), EmailError>;
}

/// Client for the transactional email HTTP API
#[derive(Clone)]
pub struct EmailClient {
    http_client: reqwest::Client,
    base_url: String,
    sender: String,
    frontend_url: String,
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    #[serde(rename = "Subject")]
    subject: &'a str,
    #[serde(rename = "Html")]
    html: &'a str,
}

impl EmailClient {
    pub fn new(settings: &EmailSettings) -> Result<Self, EmailError> {
        let http_client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(EmailError::SendFailed)?;

        Ok(Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            sender: settings.sender.clone(),
            frontend_url: settings.frontend_url.clone(),
        })
    }

    /// `{frontend_url}/{path}?token=...` with the token query-encoded.
    /// A path prefix on `frontend_url` is kept.
    fn action_link(&self, path: &str, token: &str) -> Result<String, EmailError> {
        let mut base = Url::parse(&self.frontend_url)
            .map_err(|e| EmailError::InvalidLink(e.to_string()))?;
        if !base.path().ends_with('/') {
            let dir = format!("{}/", base.path());
            base.set_path(&dir);
        }

        let mut url = base
            .join(path.trim_start_matches('/'))
            .map_err(|e| EmailError::InvalidLink(e.to_string()))?;
        url.query_pairs_mut().append_pair("token", token);
        Ok(url.into())
    }

    pub async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        html_content: &str,
    ) -> Result<(), EmailError> {
        let url = format!("{}/email", self.base_url);
        let request = SendEmailRequest {
            from: &self.sender,
            to: recipient,
            subject,
            html: html_content,
        };

        self.http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(EmailError::SendFailed)?
            .error_for_status()
            .map_err(EmailError::Rejected)?;

        tracing::debug!(subject, "Email accepted by email service");
        Ok(())
    }
}

#[async_trait]
impl NotificationSender for EmailClient {
    async fn send_verification_email(
        &self,
        to: &str,
        name: &str,
        token: &str,
    ) -> Result<(), EmailError> {
        let link = self.action_link("verify-email", token)?;
        let html = format!(
            "<p>Hi {},</p>\
             <p>Please confirm your email address by following the link below. \
             The link expires in 24 hours.</p>\
             <p><a href=\"{}\">Verify email</a></p>",
            escape_html(name),
            escape_html(&link)
        );
        self.send_email(to, "Verify your email address", &html).await
    }

    async fn send_password_reset_email(
        &self,
        to: &str,
        name: &str,
        token: &str,
    ) -> Result<(), EmailError> {
        let link = self.action_link("reset-password", token)?;
        let html = format!(
            "<p>Hi {},</p>\
             <p>We received a request to reset your password. The link below expires in 1 hour. \
             If you did not ask for this, you can ignore this email.</p>\
             <p><a href=\"{}\">Reset password</a></p>",
            escape_html(name),
            escape_html(&link)
        );
        self.send_email(to, "Reset your password", &html).await
    }
}
