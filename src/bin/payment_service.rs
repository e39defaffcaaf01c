use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use vendora_server::auth::AuthManager;
use vendora_server::bus::EventProducer;
use vendora_server::payment::{self, PaymentState, StripeGateway, WebhookVerifier};
use vendora_server::{db, init_tracing, shutdown_signal, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config.rust_log);

    info!("=== Payment Service Starting ===");
    info!("Port: {}", config.port);
    info!("Provider: {}", config.provider.api_url);
    info!("Payment topic: {}", config.kafka.payment_topic);

    let pool = db::create_pool(&config.database_url, &config.db)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    db::run_migrations(&pool).await?;
    info!("Database migrations applied");

    let producer = EventProducer::new(&config.kafka)?;

    let state = Arc::new(PaymentState {
        pool,
        auth: AuthManager::new(&config)?,
        provider: Arc::new(StripeGateway::new(&config.provider)?),
        producer: producer.clone(),
        payment_topic: config.kafka.payment_topic.clone(),
        verifier: WebhookVerifier::new(config.provider.webhook_secret.clone()),
    });
    let app = payment::build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("failed to bind payment service port")?;
    info!("Payment service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("payment service server error")?;

    // Flush any buffered events before exiting
    producer.flush(Duration::from_secs(5))?;

    info!("Payment service stopped");
    Ok(())
}
