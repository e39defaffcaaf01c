use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::IntoResponse;
use axum::Router;
use tokio::net::TcpListener;

use vendora_server::auth::TokenValidation;
use vendora_server::clients::TokenValidator;
use vendora_server::config::{
    Config, DbConfig, EmailConfig, GatewayConfig, KafkaConfig, ProviderConfig, UpstreamConfig,
};
use vendora_server::error::{AppError, AppResult};

/// Upstream stub that records how many requests reach it and echoes the
/// request path back in the body.
pub struct StubUpstream {
    pub url: String,
    pub hits: Arc<AtomicUsize>,
}

pub async fn spawn_upstream() -> StubUpstream {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    let app = Router::new().fallback(move |request: Request<Body>| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            format!("upstream saw {}", request.uri().path()).into_response()
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubUpstream {
        url: format!("http://{addr}"),
        hits,
    }
}

/// Scripted validator verdicts for gateway tests.
pub enum Verdict {
    Valid(String),
    Invalid,
    Unreachable,
}

pub struct StubValidator {
    pub verdict: Verdict,
    pub calls: Arc<AtomicUsize>,
}

impl StubValidator {
    pub fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl TokenValidator for StubValidator {
    async fn validate(&self, _token: &str) -> AppResult<TokenValidation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.verdict {
            Verdict::Valid(subject) => Ok(TokenValidation::Valid {
                subject: subject.clone(),
            }),
            Verdict::Invalid => Ok(TokenValidation::Invalid),
            Verdict::Unreachable => Err(AppError::unavailable("validator down")),
        }
    }
}

/// Config literal for tests; upstream URLs get overridden per test.
pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/test".into(),
        jwt_secret: "Xk29!mQz84#pLw51&vRt63@nBh07-test".into(),
        jwt_issuer: "vendora-auth".into(),
        access_token_ttl_hours: 1,
        port: 0,
        rust_log: "info".into(),
        db: DbConfig {
            max_connections: 1,
            acquire_timeout_secs: 1,
        },
        kafka: KafkaConfig {
            brokers: "localhost:9092".into(),
            user_topic: "user-events".into(),
            product_topic: "product-events".into(),
            order_topic: "order-events".into(),
            payment_topic: "payment-events".into(),
            cart_consumer_group: "cart-projection".into(),
            notification_consumer_group: "notification-dispatch".into(),
        },
        upstreams: UpstreamConfig {
            user_service_url: "http://127.0.0.1:1".into(),
            product_service_url: "http://127.0.0.1:1".into(),
            order_service_url: "http://127.0.0.1:1".into(),
            cart_service_url: "http://127.0.0.1:1".into(),
            payment_service_url: "http://127.0.0.1:1".into(),
            notification_service_url: "http://127.0.0.1:1".into(),
            auth_service_url: "http://127.0.0.1:1".into(),
        },
        gateway: GatewayConfig {
            validate_timeout_secs: 5,
            forward_timeout_secs: 30,
        },
        provider: ProviderConfig {
            api_url: "http://127.0.0.1:1".into(),
            secret_key: "sk_test".into(),
            webhook_secret: "whsec_test".into(),
        },
        email: EmailConfig {
            api_url: "http://127.0.0.1:1".into(),
            api_key: "".into(),
            from_address: "test@vendora.dev".into(),
        },
    }
}

/// Serve a gateway built from `config` and `validator` on an ephemeral port.
pub async fn spawn_gateway(config: &Config, validator: Arc<dyn TokenValidator>) -> String {
    let app = vendora_server::gateway::build_router(config, validator).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    format!("http://{addr}")
}
