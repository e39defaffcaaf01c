// ============================================================================
// Auth Service
// ============================================================================
//
// Issues and validates access tokens. `/validate` is the hot path: the
// gateway calls it once per protected request, and it never touches the
// database. `/authenticate` checks credentials against the user store and
// mints a token on success.
//
// ============================================================================

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::auth::{AuthManager, TokenValidation};
use crate::db::{self, DbPool};
use crate::error::{AppError, AppResult};
use crate::metrics::metrics_handler;

pub struct AuthServiceState {
    pub auth: AuthManager,
    pub pool: DbPool,
}

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub token: String,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

#[derive(Deserialize)]
pub struct AuthenticateRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthenticateResponse {
    pub token: String,
    pub subject: String,
}

/// Validate a token. Always 200; the verdict lives in the body so the
/// gateway can tell "checked and rejected" from "could not check".
pub async fn validate(
    State(state): State<Arc<AuthServiceState>>,
    Json(request): Json<ValidateRequest>,
) -> Json<ValidateResponse> {
    match state.auth.validate(&request.token) {
        TokenValidation::Valid { subject } => Json(ValidateResponse {
            valid: true,
            subject: Some(subject),
        }),
        TokenValidation::Invalid => Json(ValidateResponse {
            valid: false,
            subject: None,
        }),
    }
}

/// Check email/password and mint a token.
pub async fn authenticate(
    State(state): State<Arc<AuthServiceState>>,
    Json(request): Json<AuthenticateRequest>,
) -> AppResult<Json<AuthenticateResponse>> {
    let user = db::get_user_by_email(&state.pool, &request.email)
        .await?
        .ok_or_else(|| AppError::unauthenticated("invalid credentials"))?;

    if !db::verify_password(&user, &request.password).await? {
        debug!(email = %request.email, "password mismatch");
        return Err(AppError::unauthenticated("invalid credentials"));
    }

    let subject = user.id.to_string();
    let token = state.auth.issue(&subject)?;
    info!(subject = %subject, "token issued");

    Ok(Json(AuthenticateResponse { token, subject }))
}

pub fn build_router(state: Arc<AuthServiceState>) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/metrics", get(metrics_handler))
        .route("/validate", post(validate))
        .route("/authenticate", post(authenticate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
