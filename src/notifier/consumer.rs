use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::bus::types::{OrderCreated, OrderShipped, PaymentCaptured, PaymentFailed, UserCreated};
use crate::bus::{DomainEvent, EventHandler};
use crate::db::{self, DbPool};

use super::email::{EmailMessage, Notifier};

const SUBSCRIBED: &[&str] = &[
    "UserCreated",
    "OrderCreated",
    "OrderShipped",
    "PaymentCaptured",
    "PaymentFailed",
];

/// Turns lifecycle events into transactional emails.
///
/// The offset is committed only after the notifier accepts the message, so
/// a crash mid-send redelivers the event. That means an email can go out
/// twice; it never silently goes out zero times.
pub struct NotificationHandler {
    pool: DbPool,
    notifier: Arc<dyn Notifier>,
}

impl NotificationHandler {
    pub fn new(pool: DbPool, notifier: Arc<dyn Notifier>) -> Self {
        Self { pool, notifier }
    }

    /// Payment events carry a user id, not an address. Resolve it against
    /// the user store.
    async fn email_for_user(&self, user_id: &str) -> Result<Option<String>> {
        let id = match Uuid::parse_str(user_id) {
            Ok(id) => id,
            Err(_) => {
                warn!(user_id = %user_id, "unparseable user id on payment event");
                return Ok(None);
            }
        };

        let user = db::get_user_by_id(&self.pool, id)
            .await
            .context("user lookup failed")?;
        Ok(user.map(|u| u.email))
    }
}

#[async_trait]
impl EventHandler for NotificationHandler {
    fn subscribed_types(&self) -> &[&str] {
        SUBSCRIBED
    }

    async fn handle(&self, event: DomainEvent) -> Result<()> {
        let message = match event {
            DomainEvent::UserCreated(e) => Some(welcome_email(&e)),
            DomainEvent::OrderCreated(e) => Some(order_confirmation_email(&e)),
            DomainEvent::OrderShipped(e) => Some(order_shipped_email(&e)),
            DomainEvent::PaymentCaptured(e) => match self.email_for_user(&e.user_id).await? {
                Some(to) => Some(payment_captured_email(&e, to)),
                None => {
                    warn!(order_id = %e.order_id, "no address for payment notification");
                    None
                }
            },
            DomainEvent::PaymentFailed(e) => match self.email_for_user(&e.user_id).await? {
                Some(to) => Some(payment_failed_email(&e, to)),
                None => {
                    warn!(order_id = %e.order_id, "no address for payment notification");
                    None
                }
            },
            other => {
                debug!(event_type = other.event_type(), "ignoring event");
                None
            }
        };

        if let Some(message) = message {
            self.notifier
                .send(message)
                .await
                .context("notification delivery failed")?;
        }
        Ok(())
    }
}

fn card(heading: &str, lines: &[String]) -> String {
    let body = lines
        .iter()
        .map(|line| format!("<p>{line}</p>"))
        .collect::<String>();
    format!(
        "<div style=\"margin: 0 auto; font-family: monospace; max-width: 600px;\">\
         <h2>{heading}</h2>{body}</div>"
    )
}

fn welcome_email(event: &UserCreated) -> EmailMessage {
    EmailMessage {
        to: event.email.clone(),
        subject: format!("Thank you for joining us - {}", event.name),
        html: card(
            &format!("Welcome {}!", event.name),
            &[
                "Thank you for joining us.".to_string(),
                "We're hoping you will be shopping real soon.".to_string(),
            ],
        ),
        tags: vec!["user-created".to_string(), event.id.clone()],
    }
}

fn order_confirmation_email(event: &OrderCreated) -> EmailMessage {
    let total = format!(
        "{}.{:02} {}",
        event.total_amount / 100,
        event.total_amount % 100,
        event.currency.to_uppercase()
    );
    EmailMessage {
        to: event.user_email.clone(),
        subject: format!("Order Confirmation - #{}", event.order_id),
        html: card(
            "Order Confirmed!",
            &[
                format!("Order ID: {}", event.order_id),
                format!("Total: {total}"),
                "Thank you!".to_string(),
            ],
        ),
        tags: vec!["order-confirmation".to_string(), event.order_id.clone()],
    }
}

fn order_shipped_email(event: &OrderShipped) -> EmailMessage {
    EmailMessage {
        to: event.user_email.clone(),
        subject: "Your Order Has Shipped!".to_string(),
        html: card(
            "Your order is on the way",
            &[format!("Order ID: {}", event.order_id)],
        ),
        tags: vec!["order-shipped".to_string(), event.order_id.clone()],
    }
}

fn payment_captured_email(event: &PaymentCaptured, to: String) -> EmailMessage {
    EmailMessage {
        to,
        subject: "Your payment is captured".to_string(),
        html: card(
            "Payment received",
            &[
                format!("Payment ID: {}", event.payment_id),
                "Your invoice will be with you soon.".to_string(),
            ],
        ),
        tags: vec!["payment-captured".to_string(), event.payment_id.clone()],
    }
}

fn payment_failed_email(event: &PaymentFailed, to: String) -> EmailMessage {
    let reason = if event.reason.is_empty() {
        "The provider did not give a reason.".to_string()
    } else {
        format!("Reason: {}", event.reason)
    };
    EmailMessage {
        to,
        subject: "Your payment failed".to_string(),
        html: card(
            "Your payment didn't go through",
            &[
                format!("Payment ID: {}", event.payment_id),
                reason,
                "Please retry in a little while to confirm your order.".to_string(),
            ],
        ),
        tags: vec!["payment-failed".to_string(), event.payment_id.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn welcome_email_addresses_new_user() {
        let message = welcome_email(&UserCreated {
            id: "u-1".into(),
            email: "ada@example.com".into(),
            name: "Ada".into(),
            time: Utc::now(),
        });
        assert_eq!(message.to, "ada@example.com");
        assert!(message.subject.contains("Ada"));
        assert!(message.html.contains("Welcome Ada!"));
    }

    #[test]
    fn order_confirmation_formats_total_from_cents() {
        let message = order_confirmation_email(&OrderCreated {
            order_id: "O-7".into(),
            user_id: "u-1".into(),
            user_email: "ada@example.com".into(),
            total_amount: 12305,
            currency: "usd".into(),
            status: "created".into(),
            placed_at: Utc::now(),
        });
        assert!(message.html.contains("123.05 USD"));
        assert!(message.subject.contains("O-7"));
    }

    #[test]
    fn payment_failed_email_mentions_reason() {
        let message = payment_failed_email(
            &PaymentFailed {
                payment_id: "pi_9".into(),
                order_id: "O-7".into(),
                user_id: "u-1".into(),
                reason: "card declined".into(),
                failed_at: Utc::now(),
            },
            "ada@example.com".into(),
        );
        assert!(message.html.contains("card declined"));
    }
}
