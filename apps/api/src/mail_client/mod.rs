/// Mail client — delivers verification links to users.
///
/// `AppState` carries an `Arc<dyn VerificationMailer>`: `BrevoMailer` when
/// Brevo credentials are configured, otherwise `LogMailer` for local development.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::BrevoConfig;

const BREVO_API_URL: &str = "https://api.brevo.com/v3/smtp/email";
const VERIFICATION_SUBJECT: &str = "Confirm your email address";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mail API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

#[async_trait]
pub trait VerificationMailer: Send + Sync {
    async fn send_verification(&self, to_email: &str, link: &str) -> Result<(), MailError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoEmailAddress<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoSendEmailBody<'a> {
    sender: BrevoEmailAddress<'a>,
    to: Vec<BrevoEmailAddress<'a>>,
    subject: &'a str,
    html_content: String,
    text_content: String,
}

#[derive(Debug, Deserialize)]
struct BrevoError {
    message: String,
}

/// Sends transactional mail through the Brevo SMTP API.
#[derive(Clone)]
pub struct BrevoMailer {
    client: Client,
    config: BrevoConfig,
}

impl BrevoMailer {
    pub fn new(config: BrevoConfig) -> Result<Self, MailError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .build()?,
            config,
        })
    }
}

#[async_trait]
impl VerificationMailer for BrevoMailer {
    async fn send_verification(&self, to_email: &str, link: &str) -> Result<(), MailError> {
        let (html_content, text_content) = render_verification_email(link);
        let body = BrevoSendEmailBody {
            sender: BrevoEmailAddress {
                email: &self.config.sender_email,
                name: self.config.sender_name.as_deref(),
            },
            to: vec![BrevoEmailAddress {
                email: to_email,
                name: None,
            }],
            subject: VERIFICATION_SUBJECT,
            html_content,
            text_content,
        };

        let response = self
            .client
            .post(BREVO_API_URL)
            .header("api-key", &self.config.api_key)
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!("Brevo accepted verification email (status {status})");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<BrevoError>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        Err(MailError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Development mailer: writes the link to the log instead of sending it.
pub struct LogMailer;

#[async_trait]
impl VerificationMailer for LogMailer {
    async fn send_verification(&self, to_email: &str, link: &str) -> Result<(), MailError> {
        info!("Verification link for {to_email}: {link}");
        Ok(())
    }
}

/// Builds the HTML and plain-text bodies for a verification email.
pub fn render_verification_email(link: &str) -> (String, String) {
    let html = format!(
        "<p>Thanks for signing up. Confirm your email address to start building your resume.</p>\
         <p><a href=\"{link}\">Verify my email</a></p>\
         <p>If you did not create an account you can ignore this message.</p>"
    );
    let text = format!(
        "Thanks for signing up. Confirm your email address to start building your resume.\n\n\
         {link}\n\n\
         If you did not create an account you can ignore this message.\n"
    );
    (html, text)
}
