use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{AuthManager, TokenValidation};
use crate::clients::CatalogClient;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::utils::{extract_cookie, AUTH_COOKIE};

use super::store;

pub struct CartState {
    pub pool: DbPool,
    pub auth: AuthManager,
    pub catalog: CatalogClient,
}

/// Resolve the calling user from the auth cookie. The gateway has already
/// validated the token; this re-check is stateless and keeps the service
/// safe when addressed directly.
fn authenticated_user(state: &CartState, headers: &HeaderMap) -> AppResult<Uuid> {
    let token = extract_cookie(headers, AUTH_COOKIE)
        .ok_or_else(|| AppError::unauthenticated("missing credential"))?;

    match state.auth.validate(&token) {
        TokenValidation::Valid { subject } => Uuid::parse_str(&subject)
            .map_err(|_| AppError::unauthenticated("malformed subject")),
        TokenValidation::Invalid => Err(AppError::unauthenticated("invalid credential")),
    }
}

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

pub async fn get_cart(
    State(state): State<Arc<CartState>>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let user_id = authenticated_user(&state, &headers)?;
    let items = store::get_cart(&state.pool, user_id).await?;
    let total_cents: i64 = items
        .iter()
        .map(|item| item.price_cents * item.quantity as i64)
        .sum();

    Ok(Json(json!({ "items": items, "total_cents": total_cents })))
}

pub async fn add_item(
    State(state): State<Arc<CartState>>,
    headers: HeaderMap,
    Json(request): Json<AddItemRequest>,
) -> AppResult<Json<Value>> {
    let user_id = authenticated_user(&state, &headers)?;
    if request.quantity <= 0 {
        return Err(AppError::invalid("quantity must be positive"));
    }

    let product = state.catalog.get_product(&request.product_id).await?;
    let item = store::add_to_cart(&state.pool, user_id, &product, request.quantity).await?;

    Ok(Json(json!({ "item": item })))
}

pub async fn remove_item(
    State(state): State<Arc<CartState>>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
) -> AppResult<Json<Value>> {
    let user_id = authenticated_user(&state, &headers)?;
    let removed = store::remove_from_cart(&state.pool, user_id, &product_id).await?;
    if !removed {
        return Err(AppError::not_found(format!(
            "product {product_id} not in cart"
        )));
    }

    Ok(Json(json!({ "removed": product_id })))
}
