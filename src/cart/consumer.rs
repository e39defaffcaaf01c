use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::bus::{DomainEvent, EventHandler};
use crate::db::DbPool;

use super::store;

const SUBSCRIBED: &[&str] = &["ProductUpdated"];

/// Projection consumer keeping denormalized cart rows in sync with the
/// catalog. Idempotent by construction: re-applying the same update writes
/// the same values, and an update for a product no cart holds touches zero
/// rows and still commits.
pub struct CartProjectionHandler {
    pool: DbPool,
}

impl CartProjectionHandler {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventHandler for CartProjectionHandler {
    fn subscribed_types(&self) -> &[&str] {
        SUBSCRIBED
    }

    async fn handle(&self, event: DomainEvent) -> Result<()> {
        match event {
            DomainEvent::ProductUpdated(update) => {
                let rows = store::apply_product_update(
                    &self.pool,
                    &update.id,
                    &update.name,
                    &update.image,
                    update.price_cents,
                )
                .await?;

                if rows > 0 {
                    info!(product_id = %update.id, rows = rows, "cart lines refreshed");
                } else {
                    debug!(product_id = %update.id, "product not in any cart");
                }
                Ok(())
            }
            other => {
                debug!(event_type = other.event_type(), "ignoring event");
                Ok(())
            }
        }
    }
}
