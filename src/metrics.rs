use anyhow::{Context, Result};
use prometheus::{Encoder, TextEncoder};

/// Render all registered metrics in the Prometheus text format.
pub fn gather_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&families, &mut buffer)
        .context("failed to encode metrics")?;
    String::from_utf8(buffer).context("metrics output was not valid UTF-8")
}

/// Axum handler serving `/metrics`.
pub async fn metrics_handler() -> axum::response::Response {
    use axum::response::IntoResponse;

    match gather_metrics() {
        Ok(body) => (
            [("content-type", "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to gather metrics");
            (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                "metrics unavailable",
            )
                .into_response()
        }
    }
}
