use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::config::EmailConfig;
use crate::error::{AppError, AppResult};

/// One outbound transactional email.
#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub tags: Vec<String>,
}

/// Delivery channel for notifications, abstracted so consumer logic can be
/// tested without a mail provider.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: EmailMessage) -> AppResult<()>;
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
    tags: &'a [String],
}

/// Notifier backed by an HTTP email API.
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from_address: String,
}

impl HttpMailer {
    pub fn new(config: &EmailConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| AppError::internal(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Notifier for HttpMailer {
    async fn send(&self, message: EmailMessage) -> AppResult<()> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&SendRequest {
                from: &self.from_address,
                to: &message.to,
                subject: &message.subject,
                html: &message.html,
                tags: &message.tags,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::unavailable(format!(
                "email provider returned {}",
                response.status()
            )));
        }

        info!(to = %message.to, subject = %message.subject, "email sent");
        Ok(())
    }
}
