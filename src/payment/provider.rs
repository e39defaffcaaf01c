use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::config::ProviderConfig;
use crate::error::{AppError, AppResult};

/// Request to open a payment intent with the provider.
#[derive(Debug, Clone)]
pub struct CreateIntentRequest {
    pub order_id: String,
    pub user_id: String,
    pub amount: i64,
    pub currency: String,
}

/// Provider's answer: its reference id plus the client secret the frontend
/// needs to confirm the payment.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateIntentResponse {
    pub id: String,
    pub client_secret: String,
    pub status: String,
}

/// External payment provider, abstracted so handlers can be tested without
/// network access.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_intent(&self, request: CreateIntentRequest) -> AppResult<CreateIntentResponse>;
}

/// Stripe-compatible provider speaking the form-encoded intents API.
pub struct StripeGateway {
    client: reqwest::Client,
    api_url: String,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(config: &ProviderConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::internal(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            secret_key: config.secret_key.clone(),
        })
    }
}

#[async_trait]
impl PaymentProvider for StripeGateway {
    async fn create_intent(&self, request: CreateIntentRequest) -> AppResult<CreateIntentResponse> {
        let params = [
            ("amount", request.amount.to_string()),
            ("currency", request.currency.clone()),
            ("metadata[order_id]", request.order_id.clone()),
            ("metadata[user_id]", request.user_id.clone()),
        ];

        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_url))
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::unavailable(format!(
                "payment provider returned {}",
                response.status()
            )));
        }

        let intent: CreateIntentResponse = response.json().await?;
        info!(provider_ref = %intent.id, order_id = %request.order_id, "payment intent created");
        Ok(intent)
    }
}
