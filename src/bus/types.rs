use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Domain event kinds
// ============================================================================
//
// Closed set of events on the bus. The type tag travels as a record header;
// the payload is the bare JSON body of the matching variant. Decoding is the
// single place where an unknown tag or a malformed payload is detected:
// unknown tags are skipped (forward compatibility), malformed payloads for a
// known tag are errors.
//
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserCreated {
    pub id: String,
    pub email: String,
    pub name: String,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductUpdated {
    pub id: String,
    pub name: String,
    pub image: String,
    pub price_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentInitiated {
    pub payment_id: String,
    pub order_id: String,
    pub user_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentCaptured {
    pub payment_id: String,
    pub order_id: String,
    /// Payer, carried so the dispatcher can resolve a recipient address.
    /// Optional on the wire; consumers treat empty as "no recipient".
    #[serde(default)]
    pub user_id: String,
    pub amount: i64,
    pub currency: String,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentFailed {
    pub payment_id: String,
    pub order_id: String,
    #[serde(default)]
    pub user_id: String,
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderCreated {
    pub order_id: String,
    pub user_id: String,
    pub user_email: String,
    pub total_amount: i64,
    pub currency: String,
    pub status: String,
    pub placed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderShipped {
    pub order_id: String,
    pub user_email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    UserCreated(UserCreated),
    ProductUpdated(ProductUpdated),
    PaymentInitiated(PaymentInitiated),
    PaymentCaptured(PaymentCaptured),
    PaymentFailed(PaymentFailed),
    OrderCreated(OrderCreated),
    OrderShipped(OrderShipped),
}

impl DomainEvent {
    /// Tag written to the record header.
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::UserCreated(_) => "UserCreated",
            DomainEvent::ProductUpdated(_) => "ProductUpdated",
            DomainEvent::PaymentInitiated(_) => "PaymentInitiated",
            DomainEvent::PaymentCaptured(_) => "PaymentCaptured",
            DomainEvent::PaymentFailed(_) => "PaymentFailed",
            DomainEvent::OrderCreated(_) => "OrderCreated",
            DomainEvent::OrderShipped(_) => "OrderShipped",
        }
    }

    /// Partition key: events sharing a key are delivered in emission order.
    pub fn partition_key(&self) -> &str {
        match self {
            DomainEvent::UserCreated(e) => &e.id,
            DomainEvent::ProductUpdated(e) => &e.id,
            DomainEvent::PaymentInitiated(e) => &e.order_id,
            DomainEvent::PaymentCaptured(e) => &e.order_id,
            DomainEvent::PaymentFailed(e) => &e.order_id,
            DomainEvent::OrderCreated(e) => &e.order_id,
            DomainEvent::OrderShipped(e) => &e.order_id,
        }
    }

    pub fn to_payload(&self) -> Result<Vec<u8>> {
        let bytes = match self {
            DomainEvent::UserCreated(e) => serde_json::to_vec(e),
            DomainEvent::ProductUpdated(e) => serde_json::to_vec(e),
            DomainEvent::PaymentInitiated(e) => serde_json::to_vec(e),
            DomainEvent::PaymentCaptured(e) => serde_json::to_vec(e),
            DomainEvent::PaymentFailed(e) => serde_json::to_vec(e),
            DomainEvent::OrderCreated(e) => serde_json::to_vec(e),
            DomainEvent::OrderShipped(e) => serde_json::to_vec(e),
        };
        bytes.context("failed to serialize event payload")
    }

    /// Decode a (tag, payload) pair pulled off the bus.
    ///
    /// Returns `Ok(None)` for unknown tags — consumers ignore them without
    /// touching the payload. A known tag with a malformed payload is an
    /// error and fails here, in one place, rather than mismatching fields
    /// downstream.
    pub fn decode(event_type: &str, payload: &[u8]) -> Result<Option<DomainEvent>> {
        let event = match event_type {
            "UserCreated" => DomainEvent::UserCreated(
                serde_json::from_slice(payload).context("malformed UserCreated payload")?,
            ),
            "ProductUpdated" => DomainEvent::ProductUpdated(
                serde_json::from_slice(payload).context("malformed ProductUpdated payload")?,
            ),
            "PaymentInitiated" => DomainEvent::PaymentInitiated(
                serde_json::from_slice(payload).context("malformed PaymentInitiated payload")?,
            ),
            "PaymentCaptured" => DomainEvent::PaymentCaptured(
                serde_json::from_slice(payload).context("malformed PaymentCaptured payload")?,
            ),
            "PaymentFailed" => DomainEvent::PaymentFailed(
                serde_json::from_slice(payload).context("malformed PaymentFailed payload")?,
            ),
            "OrderCreated" => DomainEvent::OrderCreated(
                serde_json::from_slice(payload).context("malformed OrderCreated payload")?,
            ),
            "OrderShipped" => DomainEvent::OrderShipped(
                serde_json::from_slice(payload).context("malformed OrderShipped payload")?,
            ),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}
