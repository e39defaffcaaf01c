use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // subject (user id)
    pub jti: String, // unique per token
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

/// Outcome of a token check. Malformed, expired, and mis-signed tokens all
/// produce `Invalid` — only the caller's transport layer can fail with an
/// error, and callers must keep those two outcomes apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenValidation {
    Valid { subject: String },
    Invalid,
}

impl TokenValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, TokenValidation::Valid { .. })
    }
}

/// Stateless HS256 token authority.
///
/// Validation is a pure signature-plus-expiry check with no datastore
/// lookup, so it can sit on the gateway hot path. All gateway instances
/// must share the same signing secret. There is no revocation list;
/// tokens die only by expiry.
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_ttl_hours: i64,
    issuer: String,
}

impl AuthManager {
    pub fn new(config: &Config) -> Result<Self> {
        if config.jwt_secret.is_empty() {
            anyhow::bail!("JWT_SECRET must be set");
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_token_ttl_hours: config.access_token_ttl_hours,
            issuer: config.jwt_issuer.clone(),
        })
    }

    /// Issue a signed token bound to `subject`.
    pub fn issue(&self, subject: &str) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.access_token_ttl_hours);

        let claims = Claims {
            sub: subject.to_string(),
            jti: Uuid::new_v4().to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("failed to encode token")
    }

    /// Verify a token. Never returns an error for bad input: garbage,
    /// expiry, and signature mismatch all map to `TokenValidation::Invalid`.
    pub fn validate(&self, token: &str) -> TokenValidation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.clone()]);

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => TokenValidation::Valid {
                subject: data.claims.sub,
            },
            Err(e) => {
                tracing::debug!(error = %e, "token rejected");
                TokenValidation::Invalid
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        Config, DbConfig, EmailConfig, GatewayConfig, KafkaConfig, ProviderConfig, UpstreamConfig,
    };

    pub(crate) fn test_config(secret: &str) -> Config {
        Config {
            database_url: "postgres://localhost/test".into(),
            jwt_secret: secret.into(),
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
                user_service_url: "http://localhost:1".into(),
                product_service_url: "http://localhost:1".into(),
                order_service_url: "http://localhost:1".into(),
                cart_service_url: "http://localhost:1".into(),
                payment_service_url: "http://localhost:1".into(),
                notification_service_url: "http://localhost:1".into(),
                auth_service_url: "http://localhost:1".into(),
            },
            gateway: GatewayConfig {
                validate_timeout_secs: 5,
                forward_timeout_secs: 30,
            },
            provider: ProviderConfig {
                api_url: "http://localhost:1".into(),
                secret_key: "sk_test".into(),
                webhook_secret: "whsec_test".into(),
            },
            email: EmailConfig {
                api_url: "http://localhost:1".into(),
                api_key: "".into(),
                from_address: "test@vendora.dev".into(),
            },
        }
    }

    const SECRET: &str = "Xk29!mQz84#pLw51&vRt63@nBh07-test";

    #[test]
    fn issue_then_validate_roundtrip() {
        let manager = AuthManager::new(&test_config(SECRET)).unwrap();
        let token = manager.issue("user-42").unwrap();
        assert_eq!(
            manager.validate(&token),
            TokenValidation::Valid {
                subject: "user-42".to_string()
            }
        );
    }

    #[test]
    fn malformed_token_is_invalid_not_error() {
        let manager = AuthManager::new(&test_config(SECRET)).unwrap();
        assert_eq!(manager.validate("not-a-jwt"), TokenValidation::Invalid);
        assert_eq!(manager.validate(""), TokenValidation::Invalid);
    }

    #[test]
    fn foreign_signature_is_invalid() {
        let ours = AuthManager::new(&test_config(SECRET)).unwrap();
        let theirs =
            AuthManager::new(&test_config("Zz91$wAb37*qRs25%dFg48^jKl60-oth")).unwrap();
        let token = theirs.issue("user-42").unwrap();
        assert_eq!(ours.validate(&token), TokenValidation::Invalid);
    }

    #[test]
    fn expired_token_is_invalid() {
        let mut config = test_config(SECRET);
        config.access_token_ttl_hours = -1;
        let manager = AuthManager::new(&config).unwrap();
        let token = manager.issue("user-42").unwrap();
        assert_eq!(manager.validate(&token), TokenValidation::Invalid);
    }
}
