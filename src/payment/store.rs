use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppResult;

use super::state::{ApplyOutcome, PaymentStatus};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: String,
    pub user_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub provider: String,
    pub provider_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn create_payment(
    pool: &DbPool,
    order_id: &str,
    user_id: &str,
    amount: i64,
    currency: &str,
    provider: &str,
    provider_ref: &str,
) -> AppResult<Payment> {
    let payment = sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO payments
            (id, order_id, user_id, amount, currency, status, provider, provider_ref,
             created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7, NOW(), NOW())
        RETURNING id, order_id, user_id, amount, currency, status, provider,
                  provider_ref, failure_reason, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(order_id)
    .bind(user_id)
    .bind(amount)
    .bind(currency)
    .bind(provider)
    .bind(provider_ref)
    .fetch_one(pool)
    .await?;

    Ok(payment)
}

pub async fn get_payment_by_order_id(pool: &DbPool, order_id: &str) -> AppResult<Option<Payment>> {
    let payment = sqlx::query_as::<_, Payment>(
        r#"
        SELECT id, order_id, user_id, amount, currency, status, provider,
               provider_ref, failure_reason, created_at, updated_at
        FROM payments
        WHERE order_id = $1
        "#,
    )
    .bind(order_id)
    .fetch_optional(pool)
    .await?;

    Ok(payment)
}

/// Apply a provider-reported terminal transition.
///
/// The update matches on `(order_id, provider_ref, status = 'pending')` so
/// a redelivered webhook or a conflicting provider reference can never
/// overwrite a settled payment. When zero rows move, the current row is
/// read back to classify what happened.
pub async fn apply_transition(
    pool: &DbPool,
    order_id: &str,
    provider_ref: &str,
    next: PaymentStatus,
    failure_reason: Option<&str>,
) -> AppResult<ApplyOutcome> {
    let result = sqlx::query(
        r#"
        UPDATE payments
        SET status = $3, failure_reason = $4, updated_at = NOW()
        WHERE order_id = $1 AND provider_ref = $2 AND status = 'pending'
        "#,
    )
    .bind(order_id)
    .bind(provider_ref)
    .bind(next)
    .bind(failure_reason)
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        return Ok(ApplyOutcome::Applied);
    }

    let current = sqlx::query_scalar::<_, PaymentStatus>(
        r#"
        SELECT status FROM payments
        WHERE order_id = $1 AND provider_ref = $2
        "#,
    )
    .bind(order_id)
    .bind(provider_ref)
    .fetch_optional(pool)
    .await?;

    match current {
        None => Ok(ApplyOutcome::NotFound),
        Some(status) if status == next => Ok(ApplyOutcome::AlreadyApplied),
        Some(_) => Ok(ApplyOutcome::Rejected),
    }
}
