use axum::{http::StatusCode, response::IntoResponse};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Application error type shared by all services.
///
/// The variants follow the system-wide taxonomy: a missing or bad credential
/// is never conflated with an unreachable dependency, because the two map to
/// different HTTP statuses and different caller behavior.
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Request-level errors =====
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("conflict: {0}")]
    Conflict(String),

    // ===== Infrastructure errors =====
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("event bus error: {0}")]
    Bus(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("unexpected error: {0}")]
    Unknown(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) | AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_)
            | AppError::Bus(_)
            | AppError::Internal(_)
            | AppError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Bus(_) => "EVENT_BUS_ERROR",
            AppError::Json(_) => "JSON_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
            AppError::Unknown(_) => "UNKNOWN_ERROR",
        }
    }

    /// User-facing message without internal details.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Unauthenticated(msg) => format!("authentication failed: {}", msg),
            AppError::UpstreamUnavailable(_) => "service unavailable".to_string(),
            AppError::NotFound(msg) => format!("not found: {}", msg),
            AppError::InvalidInput(msg) => format!("invalid input: {}", msg),
            AppError::Conflict(msg) => format!("conflict: {}", msg),
            _ => "internal server error".to_string(),
        }
    }

    /// Log this error at a level matching its severity.
    pub fn log(&self) {
        let status = self.status_code();
        let code = self.error_code();

        if status.is_server_error() {
            tracing::error!(error = %self, error_code = %code, status = %status.as_u16(), "server error");
        } else if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(error = %self, error_code = %code, "authentication failed");
        } else {
            tracing::debug!(error = %self, error_code = %code, "client error");
        }
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        AppError::Unauthenticated(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        AppError::UpstreamUnavailable(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        AppError::InvalidInput(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    pub fn bus(msg: impl Into<String>) -> Self {
        AppError::Bus(msg.into())
    }
}

impl From<rdkafka::error::KafkaError> for AppError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        AppError::Bus(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::UpstreamUnavailable(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        self.log();

        let status = self.status_code();
        let body = json!({
            "error": self.user_message(),
            "error_code": self.error_code(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_invalid_and_validator_down_are_distinct() {
        let invalid = AppError::unauthenticated("bad token");
        let down = AppError::unavailable("auth service unreachable");
        assert_eq!(invalid.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(down.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_ne!(invalid.error_code(), down.error_code());
    }

    #[test]
    fn server_errors_hide_details() {
        let err = AppError::internal("connection pool exhausted at 10.0.0.3");
        assert!(!err.user_message().contains("10.0.0.3"));
    }
}
