// ============================================================================
// Webhook Verification
// ============================================================================
//
// Stripe-style signed webhooks. The signature header carries a timestamp
// and an HMAC-SHA256 over `{timestamp}.{raw_body}`:
//
//   Stripe-Signature: t=1712345678,v1=<hex digest>
//
// Verification is constant-time and rejects timestamps outside a fixed
// tolerance window. Only after the signature checks out is the body parsed.
//
// ============================================================================

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::debug;

use crate::config::WEBHOOK_SIGNATURE_TOLERANCE_SECS;
use crate::error::{AppError, AppResult};

use super::state::PaymentStatus;

type HmacSha256 = Hmac<Sha256>;

/// A provider notification that maps onto our payment lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    pub provider_ref: String,
    pub order_id: String,
    pub user_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub failure_reason: Option<String>,
}

#[derive(Deserialize)]
struct ProviderEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: ProviderEventData,
}

#[derive(Deserialize)]
struct ProviderEventData {
    object: ProviderIntent,
}

#[derive(Deserialize)]
struct ProviderIntent {
    id: String,
    amount: i64,
    currency: String,
    #[serde(default)]
    metadata: IntentMetadata,
    #[serde(default)]
    last_payment_error: Option<PaymentError>,
}

#[derive(Deserialize, Default)]
struct IntentMetadata {
    #[serde(default)]
    order_id: String,
    #[serde(default)]
    user_id: String,
}

#[derive(Deserialize)]
struct PaymentError {
    #[serde(default)]
    message: String,
}

pub struct WebhookVerifier {
    secret: String,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verify the signature and map the event.
    ///
    /// Returns `Ok(None)` for event types we do not track; those are
    /// acknowledged without side effects. Any signature or parse problem
    /// is an error and the caller must not trust the body.
    pub fn verify(&self, payload: &[u8], signature: &str) -> AppResult<Option<WebhookEvent>> {
        let (timestamp, digest) = parse_signature_header(signature)?;

        let age = Utc::now().timestamp() - timestamp;
        if age.abs() > WEBHOOK_SIGNATURE_TOLERANCE_SECS {
            return Err(AppError::invalid("webhook timestamp outside tolerance"));
        }

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| AppError::internal("invalid webhook secret"))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(&digest)
            .map_err(|_| AppError::invalid("webhook signature mismatch"))?;

        let event: ProviderEvent = serde_json::from_slice(payload)
            .map_err(|e| AppError::invalid(format!("malformed webhook body: {e}")))?;

        let intent = event.data.object;
        match event.event_type.as_str() {
            "payment_intent.succeeded" => Ok(Some(WebhookEvent {
                provider_ref: intent.id,
                order_id: intent.metadata.order_id,
                user_id: intent.metadata.user_id,
                amount: intent.amount,
                currency: intent.currency,
                status: PaymentStatus::Succeeded,
                failure_reason: None,
            })),
            "payment_intent.payment_failed" => {
                let reason = intent
                    .last_payment_error
                    .map(|e| e.message)
                    .unwrap_or_default();
                Ok(Some(WebhookEvent {
                    provider_ref: intent.id,
                    order_id: intent.metadata.order_id,
                    user_id: intent.metadata.user_id,
                    amount: intent.amount,
                    currency: intent.currency,
                    status: PaymentStatus::Failed,
                    failure_reason: Some(reason),
                }))
            }
            other => {
                debug!(event_type = %other, "ignored webhook event type");
                Ok(None)
            }
        }
    }
}

/// Parse `t=<unix seconds>,v1=<hex digest>`. Extra comma-separated parts
/// are tolerated; `t` and `v1` are required.
fn parse_signature_header(header: &str) -> AppResult<(i64, Vec<u8>)> {
    let mut timestamp = None;
    let mut digest = None;

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = value.parse::<i64>().ok();
            }
            Some(("v1", value)) => {
                digest = hex::decode(value).ok();
            }
            _ => {}
        }
    }

    match (timestamp, digest) {
        (Some(t), Some(d)) => Ok((t, d)),
        _ => Err(AppError::invalid("malformed signature header")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        let digest = hex::encode(mac.finalize().into_bytes());
        format!("t={timestamp},v1={digest}")
    }

    fn succeeded_body() -> Vec<u8> {
        serde_json::json!({
            "type": "payment_intent.succeeded",
            "data": { "object": {
                "id": "pi_123",
                "amount": 4999,
                "currency": "usd",
                "metadata": { "order_id": "order-9", "user_id": "user-1" }
            }}
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn valid_signature_yields_succeeded_event() {
        let verifier = WebhookVerifier::new(SECRET);
        let body = succeeded_body();
        let header = sign(SECRET, Utc::now().timestamp(), &body);

        let event = verifier.verify(&body, &header).unwrap().unwrap();
        assert_eq!(event.provider_ref, "pi_123");
        assert_eq!(event.order_id, "order-9");
        assert_eq!(event.status, PaymentStatus::Succeeded);
        assert_eq!(event.failure_reason, None);
    }

    #[test]
    fn failed_event_carries_reason() {
        let verifier = WebhookVerifier::new(SECRET);
        let body = serde_json::json!({
            "type": "payment_intent.payment_failed",
            "data": { "object": {
                "id": "pi_124",
                "amount": 4999,
                "currency": "usd",
                "metadata": { "order_id": "order-9", "user_id": "user-1" },
                "last_payment_error": { "message": "card declined" }
            }}
        })
        .to_string()
        .into_bytes();
        let header = sign(SECRET, Utc::now().timestamp(), &body);

        let event = verifier.verify(&body, &header).unwrap().unwrap();
        assert_eq!(event.status, PaymentStatus::Failed);
        assert_eq!(event.failure_reason.as_deref(), Some("card declined"));
    }

    #[test]
    fn wrong_secret_rejected() {
        let verifier = WebhookVerifier::new(SECRET);
        let body = succeeded_body();
        let header = sign("whsec_other", Utc::now().timestamp(), &body);
        assert!(verifier.verify(&body, &header).is_err());
    }

    #[test]
    fn tampered_body_rejected() {
        let verifier = WebhookVerifier::new(SECRET);
        let body = succeeded_body();
        let header = sign(SECRET, Utc::now().timestamp(), &body);
        let mut tampered = body.clone();
        tampered[10] ^= 1;
        assert!(verifier.verify(&tampered, &header).is_err());
    }

    #[test]
    fn stale_timestamp_rejected() {
        let verifier = WebhookVerifier::new(SECRET);
        let body = succeeded_body();
        let stale = Utc::now().timestamp() - WEBHOOK_SIGNATURE_TOLERANCE_SECS - 60;
        let header = sign(SECRET, stale, &body);
        assert!(verifier.verify(&body, &header).is_err());
    }

    #[test]
    fn malformed_header_rejected() {
        let verifier = WebhookVerifier::new(SECRET);
        let body = succeeded_body();
        assert!(verifier.verify(&body, "garbage").is_err());
        assert!(verifier.verify(&body, "t=123").is_err());
        assert!(verifier.verify(&body, "v1=deadbeef").is_err());
    }

    #[test]
    fn untracked_event_type_is_none() {
        let verifier = WebhookVerifier::new(SECRET);
        let body = serde_json::json!({
            "type": "payment_intent.created",
            "data": { "object": { "id": "pi_125", "amount": 1, "currency": "usd" } }
        })
        .to_string()
        .into_bytes();
        let header = sign(SECRET, Utc::now().timestamp(), &body);
        assert_eq!(verifier.verify(&body, &header).unwrap(), None);
    }
}
