// ============================================================================
// Notification Dispatcher
// ============================================================================
//
// Consumes lifecycle events off the bus and dispatches transactional
// emails. No HTTP API of its own beyond health and metrics.
//
// ============================================================================

pub mod consumer;
pub mod email;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use consumer::NotificationHandler;
pub use email::{EmailMessage, HttpMailer, Notifier};

use crate::metrics::metrics_handler;

pub fn build_router() -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
}
