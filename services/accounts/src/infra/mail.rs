use anyhow::{Context as _, bail};
use serde::Serialize;
use tracing::info;

use crate::config::AccountsConfig;
use crate::domain::repository::Mailer;
use crate::domain::types::EmailMessage;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailBody {
    sender: EmailAddress,
    to: Vec<EmailAddress>,
    subject: String,
    html_content: String,
    text_content: String,
}

#[derive(Debug, Clone)]
pub struct MailCredentials {
    pub api_key: String,
    pub sender_email: String,
    pub sender_name: Option<String>,
}

/// Transactional-email client for a Brevo-compatible HTTP API.
///
/// Without credentials every message is logged and dropped, which keeps local
/// setups working without a mail provider.
#[derive(Clone)]
pub struct HttpMailer {
    pub client: reqwest::Client,
    pub endpoint: String,
    pub credentials: Option<MailCredentials>,
}

impl HttpMailer {
    pub fn from_config(config: &AccountsConfig) -> Self {
        let credentials = match (&config.mail_api_key, &config.mail_sender_email) {
            (Some(api_key), Some(sender_email))
                if !api_key.trim().is_empty() && !sender_email.trim().is_empty() =>
            {
                Some(MailCredentials {
                    api_key: api_key.trim().to_owned(),
                    sender_email: sender_email.trim().to_owned(),
                    sender_name: config.mail_sender_name.clone(),
                })
            }
            _ => None,
        };
        Self {
            client: reqwest::Client::new(),
            endpoint: config.mail_api_url.clone(),
            credentials,
        }
    }
}

impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        let Some(credentials) = &self.credentials else {
            info!(
                to = %message.to_email,
                subject = %message.subject,
                "mail transport not configured; message not sent"
            );
            return Ok(());
        };

        let body = SendEmailBody {
            sender: EmailAddress {
                email: credentials.sender_email.clone(),
                name: credentials.sender_name.clone(),
            },
            to: vec![EmailAddress {
                email: message.to_email.clone(),
                name: message.to_name.clone(),
            }],
            subject: message.subject.clone(),
            html_content: message.html.clone(),
            text_content: message.text.clone(),
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .header("api-key", &credentials.api_key)
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await
            .context("send email request")?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        bail!("mail provider rejected message (status={status}): {body}")
    }
}
