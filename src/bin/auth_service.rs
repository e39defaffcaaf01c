use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use vendora_server::auth::AuthManager;
use vendora_server::auth_service::{self, AuthServiceState};
use vendora_server::{db, init_tracing, shutdown_signal, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config.rust_log);

    info!("=== Auth Service Starting ===");
    info!("Port: {}", config.port);

    let pool = db::create_pool(&config.database_url, &config.db)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    db::run_migrations(&pool).await?;
    info!("Database migrations applied");

    let state = Arc::new(AuthServiceState {
        auth: AuthManager::new(&config)?,
        pool,
    });
    let app = auth_service::build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("failed to bind auth service port")?;
    info!("Auth service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("auth service server error")?;

    info!("Auth service stopped");
    Ok(())
}
