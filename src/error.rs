//! # Error Handling
//!
//! Custom error types and their mapping to HTTP responses. The taxonomy is
//! deliberate and uniform across handlers:
//!
//! - `NotFound` (404): unknown candidate or no session for the candidate.
//! - `BadRequest` / `ValidationError` (400): malformed input, bad question
//!   index, illegal session transition (e.g. double-finish).
//! - `Adapter` (500): a fatal external-collaborator failure (audio
//!   normalization, an adapter the workflow cannot proceed without).
//! - `Store` (500): the authoritative store failed a read or write.
//! - `Internal` / `Config` (500): everything else.
//!
//! Degraded transcription is intentionally NOT represented here. A
//! recognition failure is a recoverable, logged event that turns into a
//! sentinel answer and `status: "error"` in the response body — the request
//! itself still succeeds.

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

use crate::session::TransitionError;

#[derive(Debug)]
pub enum AppError {
    /// Requested candidate or session does not exist.
    NotFound(String),

    /// Client sent invalid or malformed data.
    BadRequest(String),

    /// Input failed a domain rule (bad index, illegal transition).
    ValidationError(String),

    /// An external adapter failed in a way the workflow cannot absorb.
    Adapter(String),

    /// The authoritative session/transcript store failed.
    Store(String),

    /// Configuration loading or validation problems.
    Config(String),

    /// Anything else server-side.
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::Adapter(msg) => write!(f, "Adapter failure: {}", msg),
            AppError::Store(msg) => write!(f, "Store failure: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

/// Converts errors into the JSON envelope every endpoint shares:
///
/// ```json
/// {
///   "error": {
///     "type": "not_found",
///     "message": "No session for candidate c1",
///     "timestamp": "2025-01-01T12:00:00Z"
///   }
/// }
/// ```
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_type, message) = match self {
            AppError::NotFound(msg) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "not_found",
                msg.clone(),
            ),
            AppError::BadRequest(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "bad_request",
                msg.clone(),
            ),
            AppError::ValidationError(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "validation_error",
                msg.clone(),
            ),
            AppError::Adapter(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "adapter_failure",
                msg.clone(),
            ),
            AppError::Store(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "store_failure",
                msg.clone(),
            ),
            AppError::Config(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "config_error",
                msg.clone(),
            ),
            AppError::Internal(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg.clone(),
            ),
        };

        HttpResponse::build(status).json(json!({
            "error": {
                "type": error_type,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Adapter(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Illegal session transitions surface as 400s with the transition's own
/// wording ("interview already finished", ...).
impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_found = AppError::NotFound("x".into());
        assert_eq!(not_found.error_response().status().as_u16(), 404);

        let bad_index = AppError::ValidationError("x".into());
        assert_eq!(bad_index.error_response().status().as_u16(), 400);

        let adapter = AppError::Adapter("x".into());
        assert_eq!(adapter.error_response().status().as_u16(), 500);
    }

    #[test]
    fn test_transition_error_is_client_visible() {
        let err: AppError = TransitionError::AlreadyFinished.into();
        assert_eq!(err.error_response().status().as_u16(), 400);
        assert!(err.to_string().contains("already finished"));
    }
}
