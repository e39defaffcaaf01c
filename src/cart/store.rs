use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::clients::ProductInfo;
use crate::db::DbPool;
use crate::error::AppResult;

/// One line in a user's cart. Product name, image, and price are
/// denormalized at add time and kept fresh by the projection consumer.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartItem {
    pub user_id: Uuid,
    pub product_id: String,
    pub name: String,
    pub image: String,
    pub price_cents: i64,
    pub quantity: i32,
    pub updated_at: DateTime<Utc>,
}

pub async fn get_cart(pool: &DbPool, user_id: Uuid) -> AppResult<Vec<CartItem>> {
    let items = sqlx::query_as::<_, CartItem>(
        r#"
        SELECT user_id, product_id, name, image, price_cents, quantity, updated_at
        FROM cart_items
        WHERE user_id = $1
        ORDER BY updated_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(items)
}

/// Add a product to the cart, or bump its quantity if already present.
/// `(user_id, product_id)` is unique, so repeated adds never duplicate lines.
pub async fn add_to_cart(
    pool: &DbPool,
    user_id: Uuid,
    product: &ProductInfo,
    quantity: i32,
) -> AppResult<CartItem> {
    let item = sqlx::query_as::<_, CartItem>(
        r#"
        INSERT INTO cart_items (user_id, product_id, name, image, price_cents, quantity, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, NOW())
        ON CONFLICT (user_id, product_id)
        DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity,
                      updated_at = NOW()
        RETURNING user_id, product_id, name, image, price_cents, quantity, updated_at
        "#,
    )
    .bind(user_id)
    .bind(&product.id)
    .bind(&product.name)
    .bind(&product.image)
    .bind(product.price_cents)
    .bind(quantity)
    .fetch_one(pool)
    .await?;

    Ok(item)
}

/// Remove a product line entirely. Returns whether anything was deleted.
pub async fn remove_from_cart(pool: &DbPool, user_id: Uuid, product_id: &str) -> AppResult<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM cart_items
        WHERE user_id = $1 AND product_id = $2
        "#,
    )
    .bind(user_id)
    .bind(product_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Refresh the denormalized product fields across every cart holding the
/// product. One statement updates all affected rows; returns the count.
pub async fn apply_product_update(
    pool: &DbPool,
    product_id: &str,
    name: &str,
    image: &str,
    price_cents: i64,
) -> AppResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE cart_items
        SET name = $2, image = $3, price_cents = $4, updated_at = NOW()
        WHERE product_id = $1
        "#,
    )
    .bind(product_id)
    .bind(name)
    .bind(image)
    .bind(price_cents)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
