// ============================================================================
// Edge Gateway
// ============================================================================
//
// Single entry point for client traffic. Resolves each request against a
// static prefix routing table, enforces cookie-token authentication on
// protected prefixes by calling the auth service, and forwards the request
// to the owning upstream verbatim.
//
// ============================================================================

pub mod handler;
pub mod proxy;
pub mod routes;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use handler::{route_request, GatewayState};
pub use proxy::ServiceClient;
pub use routes::{RouteEntry, RouteTable};

use crate::clients::TokenValidator;
use crate::config::Config;
use crate::error::AppResult;
use crate::metrics::metrics_handler;

/// Build the gateway router around an injected validator.
pub fn build_router(config: &Config, validator: Arc<dyn TokenValidator>) -> AppResult<Router> {
    let state = Arc::new(GatewayState {
        routes: RouteTable::from_config(&config.upstreams),
        validator,
        client: ServiceClient::new(config.gateway.forward_timeout_secs)?,
    });

    Ok(Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/metrics", get(metrics_handler))
        .fallback(route_request)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
