use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{error, info};

use vendora_server::auth::AuthManager;
use vendora_server::bus::{run_consumer_loop, EventConsumer, EventProducer};
use vendora_server::cart::{self, CartProjectionHandler, CartState};
use vendora_server::clients::CatalogClient;
use vendora_server::{db, init_tracing, shutdown_signal, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config.rust_log);

    info!("=== Cart Service Starting ===");
    info!("Port: {}", config.port);
    info!("Kafka brokers: {}", config.kafka.brokers);
    info!("Product topic: {}", config.kafka.product_topic);

    let pool = db::create_pool(&config.database_url, &config.db)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    db::run_migrations(&pool).await?;
    info!("Database migrations applied");

    // Projection consumer keeping denormalized product data fresh
    let consumer = EventConsumer::new(
        &config.kafka,
        &config.kafka.cart_consumer_group,
        &[&config.kafka.product_topic],
    )?;
    let quarantine_producer = EventProducer::new(&config.kafka)?;
    let handler = CartProjectionHandler::new(pool.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer_task = tokio::spawn(async move {
        if let Err(e) = run_consumer_loop(consumer, quarantine_producer, handler, shutdown_rx).await
        {
            error!(error = %e, "cart projection consumer exited with error");
        }
    });

    let state = Arc::new(CartState {
        pool,
        auth: AuthManager::new(&config)?,
        catalog: CatalogClient::new(&config)?,
    });
    let app = cart::build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("failed to bind cart service port")?;
    info!("Cart service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("cart service server error")?;

    // Drain the consumer before exiting
    let _ = shutdown_tx.send(true);
    let _ = consumer_task.await;

    info!("Cart service stopped");
    Ok(())
}
