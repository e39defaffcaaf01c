use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{error, info};

use vendora_server::bus::{run_consumer_loop, EventConsumer, EventProducer};
use vendora_server::notifier::{self, HttpMailer, NotificationHandler};
use vendora_server::{db, init_tracing, shutdown_signal, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config.rust_log);

    info!("=== Notification Service Starting ===");
    info!("Port: {}", config.port);
    info!("Kafka brokers: {}", config.kafka.brokers);

    let pool = db::create_pool(&config.database_url, &config.db)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    let consumer = EventConsumer::new(
        &config.kafka,
        &config.kafka.notification_consumer_group,
        &[
            &config.kafka.user_topic,
            &config.kafka.order_topic,
            &config.kafka.payment_topic,
        ],
    )?;
    let quarantine_producer = EventProducer::new(&config.kafka)?;
    let mailer = Arc::new(HttpMailer::new(&config.email)?);
    let handler = NotificationHandler::new(pool, mailer);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer_task = tokio::spawn(async move {
        if let Err(e) = run_consumer_loop(consumer, quarantine_producer, handler, shutdown_rx).await
        {
            error!(error = %e, "notification consumer exited with error");
        }
    });

    let app = notifier::build_router();

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("failed to bind notification service port")?;
    info!("Notification service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("notification service server error")?;

    let _ = shutdown_tx.send(true);
    let _ = consumer_task.await;

    info!("Notification service stopped");
    Ok(())
}
