use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::auth::TokenValidation;
use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Remote token validation, abstracted for testing.
///
/// Implementations must keep "the credential is bad" and "the validator
/// could not be reached" apart: the former is a `TokenValidation::Invalid`
/// inside `Ok`, the latter an `Err`.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str) -> AppResult<TokenValidation>;
}

#[derive(Serialize)]
struct ValidateRequest<'a> {
    token: &'a str,
}

#[derive(Deserialize)]
struct ValidateResponse {
    valid: bool,
    #[serde(default)]
    subject: Option<String>,
}

/// Token validator backed by the auth service's `/validate` endpoint.
///
/// Uses a short dedicated timeout: this call sits on the hot path of every
/// protected request, ahead of the much longer forward timeout.
pub struct HttpTokenValidator {
    client: reqwest::Client,
    validate_url: String,
}

impl HttpTokenValidator {
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.gateway.validate_timeout_secs))
            .pool_max_idle_per_host(32)
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::internal(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            validate_url: format!("{}/validate", config.upstreams.auth_service_url),
        })
    }
}

#[async_trait]
impl TokenValidator for HttpTokenValidator {
    async fn validate(&self, token: &str) -> AppResult<TokenValidation> {
        let response = self
            .client
            .post(&self.validate_url)
            .json(&ValidateRequest { token })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::unavailable(format!(
                "token validator returned {}",
                response.status()
            )));
        }

        let body: ValidateResponse = response.json().await?;
        match (body.valid, body.subject) {
            (true, Some(subject)) => Ok(TokenValidation::Valid { subject }),
            _ => Ok(TokenValidation::Invalid),
        }
    }
}
