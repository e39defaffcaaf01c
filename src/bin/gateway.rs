use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use vendora_server::clients::HttpTokenValidator;
use vendora_server::{gateway, init_tracing, shutdown_signal, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config.rust_log);

    info!("=== Gateway Starting ===");
    info!("Port: {}", config.port);
    info!("Auth service: {}", config.upstreams.auth_service_url);

    let validator = Arc::new(HttpTokenValidator::new(&config)?);
    let app = gateway::build_router(&config, validator)?;

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("failed to bind gateway port")?;
    info!("Gateway listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("gateway server error")?;

    info!("Gateway stopped");
    Ok(())
}
