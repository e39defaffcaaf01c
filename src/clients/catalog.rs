use std::time::Duration;

use serde::Deserialize;

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Product fields the cart denormalizes at add time.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    pub price_cents: i64,
}

/// Read-only client for the product catalog service.
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(16)
            .build()
            .map_err(|e| AppError::internal(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.upstreams.product_service_url.clone(),
        })
    }

    /// Fetch a product by id. A 404 from the catalog maps to `NotFound`
    /// so cart handlers can surface it as a client error.
    pub async fn get_product(&self, product_id: &str) -> AppResult<ProductInfo> {
        let url = format!("{}/products/get?id={}", self.base_url, product_id);
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::not_found(format!("product {product_id}")));
        }
        if !response.status().is_success() {
            return Err(AppError::unavailable(format!(
                "catalog returned {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }
}
