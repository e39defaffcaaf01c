// ============================================================================
// Service Client
// ============================================================================
//
// HTTP client for forwarding gateway traffic to upstream services.
// Handles:
// - Request forwarding with verbatim method/path/query/body
// - X-Forwarded-* header injection
// - Response proxying with streamed bodies
//
// ============================================================================

use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderValue, Request, Response};
use tracing::warn;

use crate::error::{AppError, AppResult};

/// HTTP client for forwarding requests to upstream services.
///
/// One shared instance per gateway process; reqwest pools connections per
/// host underneath.
pub struct ServiceClient {
    client: reqwest::Client,
}

impl ServiceClient {
    pub fn new(timeout_secs: u64) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .tcp_keepalive(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| AppError::internal(format!("failed to create http client: {e}")))?;

        Ok(Self { client })
    }

    /// Forward `request` to `service_url`, preserving method, path, query,
    /// headers, and body. The upstream's status, headers, and body come back
    /// verbatim; only transport failures surface as errors.
    pub async fn forward_request(
        &self,
        service_url: &str,
        request: Request<Body>,
    ) -> AppResult<Response<Body>> {
        let path = request.uri().path();
        let target_url = match request.uri().query() {
            Some(query) => format!("{}{}?{}", service_url, path, query),
            None => format!("{}{}", service_url, path),
        };

        let method = request.method().clone();
        let headers = request.headers().clone();
        let client_host = headers
            .get("host")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let (_parts, body) = request.into_parts();
        let body_bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|e| AppError::invalid(format!("failed to read request body: {e}")))?;

        let mut upstream_request = self.client.request(method, &target_url);

        // Copy headers except Host, which reqwest sets for the target
        for (key, value) in headers.iter() {
            if key != "host" {
                upstream_request = upstream_request.header(key, value);
            }
        }
        if !client_host.is_empty() {
            upstream_request = upstream_request.header("x-forwarded-host", &client_host);
        }
        upstream_request = upstream_request.header("x-forwarded-proto", "http");

        if !body_bytes.is_empty() {
            upstream_request = upstream_request.body(body_bytes.to_vec());
        }

        let response = upstream_request.send().await.map_err(|e| {
            warn!(target_url = %target_url, error = %e, "upstream request failed");
            AppError::unavailable(format!("upstream request failed: {e}"))
        })?;

        let status = response.status();
        let mut proxied = Response::builder().status(status);
        for (key, value) in response.headers().iter() {
            proxied = proxied.header(key, value);
        }

        proxied
            .body(Body::from_stream(response.bytes_stream()))
            .map_err(|e| AppError::internal(format!("failed to build response: {e}")))
    }

    /// Hit an upstream's `/health` endpoint.
    pub async fn check_health(&self, service_url: &str) -> bool {
        let health_url = format!("{}/health", service_url);
        match self
            .client
            .get(&health_url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!(service_url = %service_url, error = %e, "service health check failed");
                false
            }
        }
    }
}

/// Append the caller's address to `X-Forwarded-For` on the request before
/// it is handed to the service client.
pub fn set_forwarded_for(request: &mut Request<Body>, client_addr: &str) {
    let value = match request.headers().get("x-forwarded-for") {
        Some(existing) => match existing.to_str() {
            Ok(prior) => format!("{}, {}", prior, client_addr),
            Err(_) => client_addr.to_string(),
        },
        None => client_addr.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        request.headers_mut().insert("x-forwarded-for", value);
    }
}
