use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

use crate::auth::TokenValidation;
use crate::clients::TokenValidator;
use crate::error::AppError;
use crate::gateway::proxy::{set_forwarded_for, ServiceClient};
use crate::gateway::routes::RouteTable;
use crate::utils::{extract_cookie, AUTH_COOKIE};

/// Shared state for the gateway's catch-all handler.
pub struct GatewayState {
    pub routes: RouteTable,
    pub validator: Arc<dyn TokenValidator>,
    pub client: ServiceClient,
}

/// Catch-all entry point: resolve the route, enforce authentication on
/// protected prefixes, then forward.
///
/// Authentication fails closed. A missing or rejected credential gives 401;
/// an unreachable validator gives 503. The two are never conflated, and no
/// byte reaches the upstream until the check has passed.
pub async fn route_request(
    State(state): State<Arc<GatewayState>>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    mut request: Request<Body>,
) -> Response {
    let path = request.uri().path().to_string();

    let entry = match state.routes.resolve(&path) {
        Some(entry) => entry.clone(),
        None => {
            debug!(path = %path, "no route for path");
            return AppError::not_found(format!("no route for {path}")).into_response();
        }
    };

    if entry.protected {
        let token = match extract_cookie(request.headers(), AUTH_COOKIE) {
            Some(token) => token,
            None => {
                debug!(path = %path, "missing auth cookie");
                return AppError::unauthenticated("missing credential").into_response();
            }
        };

        match state.validator.validate(&token).await {
            Ok(TokenValidation::Valid { subject }) => {
                debug!(path = %path, subject = %subject, "request authenticated");
            }
            Ok(TokenValidation::Invalid) => {
                debug!(path = %path, "credential rejected");
                return AppError::unauthenticated("invalid credential").into_response();
            }
            Err(e) => {
                warn!(path = %path, error = %e, "token validator unreachable");
                return AppError::unavailable("authentication unavailable").into_response();
            }
        }
    }

    set_forwarded_for(&mut request, &client_addr.ip().to_string());

    match state.client.forward_request(&entry.upstream, request).await {
        Ok(response) => response,
        Err(e) => {
            warn!(path = %path, upstream = %entry.upstream, error = %e, "forward failed");
            e.into_response()
        }
    }
}
