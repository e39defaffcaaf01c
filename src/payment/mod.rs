// ============================================================================
// Payment Service
// ============================================================================
//
// Payments move through a small state machine: pending until the provider
// reports an outcome, then terminal forever. The provider reports outcomes
// through signed webhooks; each applied transition announces itself on the
// payment topic.
//
// ============================================================================

pub mod handlers;
pub mod provider;
pub mod state;
pub mod store;
pub mod webhook;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use handlers::PaymentState;
pub use provider::{PaymentProvider, StripeGateway};
pub use state::{ApplyOutcome, PaymentStatus};
pub use store::Payment;
pub use webhook::{WebhookEvent, WebhookVerifier};

use crate::metrics::metrics_handler;

pub fn build_router(state: Arc<PaymentState>) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/metrics", get(metrics_handler))
        .route("/payments/create", post(handlers::create_intent))
        .route("/payments/:order_id", get(handlers::get_payment))
        .route("/payments/webhook", post(handlers::handle_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
