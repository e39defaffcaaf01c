use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::auth::{AuthManager, TokenValidation};
use crate::bus::types::{PaymentCaptured, PaymentFailed, PaymentInitiated};
use crate::bus::{DomainEvent, EventProducer};
use crate::config::MAX_WEBHOOK_BODY_SIZE;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::utils::{extract_cookie, AUTH_COOKIE};

use super::provider::{CreateIntentRequest, PaymentProvider};
use super::state::{ApplyOutcome, PaymentStatus};
use super::store;
use super::webhook::{WebhookEvent, WebhookVerifier};

pub struct PaymentState {
    pub pool: DbPool,
    pub auth: AuthManager,
    pub provider: Arc<dyn PaymentProvider>,
    pub producer: EventProducer,
    pub payment_topic: String,
    pub verifier: WebhookVerifier,
}

fn authenticated_user(state: &PaymentState, headers: &HeaderMap) -> AppResult<String> {
    let token = extract_cookie(headers, AUTH_COOKIE)
        .ok_or_else(|| AppError::unauthenticated("missing credential"))?;

    match state.auth.validate(&token) {
        TokenValidation::Valid { subject } => Ok(subject),
        TokenValidation::Invalid => Err(AppError::unauthenticated("invalid credential")),
    }
}

#[derive(Deserialize)]
pub struct CreateIntentBody {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
}

/// Open a payment: ask the provider for an intent, persist a pending row
/// holding the provider's reference, then announce PaymentInitiated.
///
/// The row insert and the event publish are two separate writes; a crash
/// between them loses the announcement but never the payment.
pub async fn create_intent(
    State(state): State<Arc<PaymentState>>,
    headers: HeaderMap,
    Json(body): Json<CreateIntentBody>,
) -> AppResult<impl IntoResponse> {
    let user_id = authenticated_user(&state, &headers)?;

    if body.order_id.trim().is_empty() {
        return Err(AppError::invalid("order_id must not be empty"));
    }
    if body.amount <= 0 {
        return Err(AppError::invalid("amount must be positive"));
    }
    if body.currency.len() != 3 {
        return Err(AppError::invalid("currency must be a 3-letter code"));
    }

    let intent = state
        .provider
        .create_intent(CreateIntentRequest {
            order_id: body.order_id.clone(),
            user_id: user_id.clone(),
            amount: body.amount,
            currency: body.currency.clone(),
        })
        .await?;

    let payment = store::create_payment(
        &state.pool,
        &body.order_id,
        &user_id,
        body.amount,
        &body.currency,
        "stripe",
        &intent.id,
    )
    .await?;

    let event = DomainEvent::PaymentInitiated(PaymentInitiated {
        payment_id: payment.id.to_string(),
        order_id: payment.order_id.clone(),
        user_id,
        amount: payment.amount,
        currency: payment.currency.clone(),
        status: payment.status.as_str().to_string(),
        created_at: payment.created_at,
    });
    if let Err(e) = state.producer.publish(&state.payment_topic, &event).await {
        error!(order_id = %payment.order_id, error = %e, "failed to publish PaymentInitiated");
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "payment_id": payment.id,
            "client_secret": intent.client_secret,
            "status": payment.status,
        })),
    ))
}

pub async fn get_payment(
    State(state): State<Arc<PaymentState>>,
    headers: HeaderMap,
    Path(order_id): Path<String>,
) -> AppResult<Json<store::Payment>> {
    authenticated_user(&state, &headers)?;

    let payment = store::get_payment_by_order_id(&state.pool, &order_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("payment for order {order_id}")))?;

    Ok(Json(payment))
}

/// Provider webhook endpoint.
///
/// Flow: cap the body size, verify the signature, apply the state
/// transition, and only on a fresh transition publish the matching event.
/// Redelivered webhooks for an already-settled payment are acknowledged
/// without re-publishing; a webhook contradicting a settled payment is a
/// conflict.
pub async fn handle_webhook(
    State(state): State<Arc<PaymentState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<StatusCode> {
    if body.len() > MAX_WEBHOOK_BODY_SIZE {
        return Err(AppError::invalid("webhook body too large"));
    }

    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::invalid("missing signature header"))?;

    let event = match state.verifier.verify(&body, signature)? {
        Some(event) => event,
        None => return Ok(StatusCode::OK),
    };

    let outcome = store::apply_transition(
        &state.pool,
        &event.order_id,
        &event.provider_ref,
        event.status,
        event.failure_reason.as_deref(),
    )
    .await?;

    match outcome {
        ApplyOutcome::Applied => {
            publish_settlement(&state, &event).await;
            Ok(StatusCode::OK)
        }
        ApplyOutcome::AlreadyApplied => {
            info!(order_id = %event.order_id, status = event.status.as_str(),
                "webhook redelivery for settled payment");
            Ok(StatusCode::OK)
        }
        ApplyOutcome::NotFound => {
            warn!(order_id = %event.order_id, provider_ref = %event.provider_ref,
                "webhook for unknown payment ignored");
            Ok(StatusCode::OK)
        }
        ApplyOutcome::Rejected => Err(AppError::conflict(format!(
            "payment for order {} already settled differently",
            event.order_id
        ))),
    }
}

/// Publish the event matching a freshly applied transition. The database
/// write has already happened; a publish failure here is logged and the
/// webhook still acknowledged, since the provider retrying would find
/// AlreadyApplied and not help.
async fn publish_settlement(state: &PaymentState, event: &WebhookEvent) {
    let payment_id = match store::get_payment_by_order_id(&state.pool, &event.order_id).await {
        Ok(Some(payment)) => payment.id.to_string(),
        _ => event.provider_ref.clone(),
    };

    let domain_event = match event.status {
        PaymentStatus::Succeeded => DomainEvent::PaymentCaptured(PaymentCaptured {
            payment_id,
            order_id: event.order_id.clone(),
            user_id: event.user_id.clone(),
            amount: event.amount,
            currency: event.currency.clone(),
            captured_at: Utc::now(),
        }),
        PaymentStatus::Failed => DomainEvent::PaymentFailed(PaymentFailed {
            payment_id,
            order_id: event.order_id.clone(),
            user_id: event.user_id.clone(),
            reason: event.failure_reason.clone().unwrap_or_default(),
            failed_at: Utc::now(),
        }),
        _ => return,
    };

    if let Err(e) = state
        .producer
        .publish(&state.payment_topic, &domain_event)
        .await
    {
        error!(order_id = %event.order_id, error = %e, "failed to publish settlement event");
    }
}
