pub mod auth;
pub mod auth_service;
pub mod bus;
pub mod cart;
pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod notifier;
pub mod payment;
pub mod utils;

pub use config::Config;
pub use error::{AppError, AppResult};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging for a service binary.
///
/// Filter comes from `RUST_LOG` (via config), defaulting to `info`.
pub fn init_tracing(filter: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Resolves when the process receives Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("signal received, shutting down");
}
