use anyhow::Result;

// ============================================================================
// Configuration Constants
// ============================================================================

const DEFAULT_PORT: u16 = 8080;

/// Timeout for the synchronous token-validation RPC on the gateway hot path.
const DEFAULT_VALIDATE_TIMEOUT_SECS: u64 = 5;

/// Timeout for forwarding a request to an upstream service.
const DEFAULT_FORWARD_TIMEOUT_SECS: u64 = 30;

const DEFAULT_ACCESS_TOKEN_TTL_HOURS: i64 = 24;

/// Webhook bodies larger than this are rejected before signature verification.
pub const MAX_WEBHOOK_BODY_SIZE: usize = 64 * 1024; // 64 KiB

/// Maximum accepted clock skew on webhook signature timestamps.
pub const WEBHOOK_SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Delivery attempts per message before it is quarantined.
pub const MAX_DELIVERY_ATTEMPTS: u32 = 5;

// ============================================================================
// Configuration Structures
// ============================================================================

/// Database connection pool configuration
#[derive(Clone, Debug)]
pub struct DbConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

/// Kafka configuration shared by producers and consumers
#[derive(Clone, Debug)]
pub struct KafkaConfig {
    /// Comma-separated list of brokers (e.g., "kafka1:9092,kafka2:9092")
    pub brokers: String,
    pub user_topic: String,
    pub product_topic: String,
    pub order_topic: String,
    pub payment_topic: String,
    /// Consumer group for the cart consistency consumer
    pub cart_consumer_group: String,
    /// Consumer group for the notification dispatcher
    pub notification_consumer_group: String,
}

/// Upstream service locations for the gateway routing table
#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    pub user_service_url: String,
    pub product_service_url: String,
    pub order_service_url: String,
    pub cart_service_url: String,
    pub payment_service_url: String,
    pub notification_service_url: String,
    pub auth_service_url: String,
}

/// Gateway timeouts, each independent of the other
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub validate_timeout_secs: u64,
    pub forward_timeout_secs: u64,
}

/// Payment provider (Stripe-compatible) configuration
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    pub api_url: String,
    pub secret_key: String,
    /// Shared secret for webhook signature verification
    pub webhook_secret: String,
}

/// Outbound transactional email configuration
#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from_address: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub access_token_ttl_hours: i64,
    pub port: u16,
    pub rust_log: String,
    pub db: DbConfig,
    pub kafka: KafkaConfig,
    pub upstreams: UpstreamConfig,
    pub gateway: GatewayConfig,
    pub provider: ProviderConfig,
    pub email: EmailConfig,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = std::env::var("JWT_SECRET")?;
        if let Err(e) = crate::utils::validate_secret_strength(&jwt_secret, 32) {
            anyhow::bail!(
                "JWT_SECRET is too weak: {}. Generate one with: openssl rand -base64 32",
                e
            );
        }

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")?,
            jwt_secret,
            jwt_issuer: env_or("JWT_ISSUER", "vendora-auth"),
            access_token_ttl_hours: env_parse_or(
                "ACCESS_TOKEN_TTL_HOURS",
                DEFAULT_ACCESS_TOKEN_TTL_HOURS,
            ),
            port: env_parse_or("PORT", DEFAULT_PORT),
            rust_log: env_or("RUST_LOG", "info"),
            db: DbConfig {
                max_connections: env_parse_or("DB_MAX_CONNECTIONS", 10),
                acquire_timeout_secs: env_parse_or("DB_ACQUIRE_TIMEOUT_SECS", 5),
            },
            kafka: KafkaConfig {
                brokers: env_or("KAFKA_BROKERS", "localhost:9092"),
                user_topic: env_or("KAFKA_USER_TOPIC", "user-events"),
                product_topic: env_or("KAFKA_PRODUCT_TOPIC", "product-events"),
                order_topic: env_or("KAFKA_ORDER_TOPIC", "order-events"),
                payment_topic: env_or("KAFKA_PAYMENT_TOPIC", "payment-events"),
                cart_consumer_group: env_or("KAFKA_CART_GROUP", "cart-projection"),
                notification_consumer_group: env_or(
                    "KAFKA_NOTIFICATION_GROUP",
                    "notification-dispatch",
                ),
            },
            upstreams: UpstreamConfig {
                user_service_url: env_or("USER_SERVICE_URL", "http://localhost:8081"),
                product_service_url: env_or("PRODUCT_SERVICE_URL", "http://localhost:8082"),
                order_service_url: env_or("ORDER_SERVICE_URL", "http://localhost:8083"),
                cart_service_url: env_or("CART_SERVICE_URL", "http://localhost:8084"),
                payment_service_url: env_or("PAYMENT_SERVICE_URL", "http://localhost:8085"),
                notification_service_url: env_or(
                    "NOTIFICATION_SERVICE_URL",
                    "http://localhost:8086",
                ),
                auth_service_url: env_or("AUTH_SERVICE_URL", "http://localhost:8087"),
            },
            gateway: GatewayConfig {
                validate_timeout_secs: env_parse_or(
                    "GATEWAY_VALIDATE_TIMEOUT_SECS",
                    DEFAULT_VALIDATE_TIMEOUT_SECS,
                ),
                forward_timeout_secs: env_parse_or(
                    "GATEWAY_FORWARD_TIMEOUT_SECS",
                    DEFAULT_FORWARD_TIMEOUT_SECS,
                ),
            },
            provider: ProviderConfig {
                api_url: env_or("STRIPE_API_URL", "https://api.stripe.com"),
                secret_key: env_or("STRIPE_SECRET_KEY", ""),
                webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET")?,
            },
            email: EmailConfig {
                api_url: env_or("EMAIL_API_URL", "https://api.resend.com/emails"),
                api_key: env_or("EMAIL_API_KEY", ""),
                from_address: env_or("EMAIL_FROM", "no-reply@vendora.dev"),
            },
        })
    }
}
