// ============================================================================
// Cart Service
// ============================================================================
//
// Owns per-user cart lines with product data denormalized into each row.
// Serves the read/write HTTP API and runs the projection consumer that
// refreshes denormalized fields when the catalog publishes ProductUpdated.
//
// ============================================================================

pub mod consumer;
pub mod handlers;
pub mod store;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use consumer::CartProjectionHandler;
pub use handlers::CartState;
pub use store::CartItem;

use crate::metrics::metrics_handler;

pub fn build_router(state: Arc<CartState>) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/metrics", get(metrics_handler))
        .route("/cart/getcart", get(handlers::get_cart))
        .route("/cart/add", post(handlers::add_item))
        .route("/cart/remove/:product_id", delete(handlers::remove_item))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
