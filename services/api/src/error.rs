//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and its
//! mapping onto HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::config::ConfigError;
use careprep_core::ports::{AuthError, PortError};

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Missing or out-of-range request input.
    #[error("{0}")]
    Validation(String),

    /// Represents a token-verification failure from the identity provider.
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    /// The status code and client-facing message for this error. Internals
    /// stay out of the payload; the full error goes to the log instead.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Auth(err) => match err {
                AuthError::MissingToken => {
                    (StatusCode::UNAUTHORIZED, "No token provided".to_string())
                }
                AuthError::ExpiredToken => {
                    (StatusCode::UNAUTHORIZED, "Token expired".to_string())
                }
                AuthError::InvalidToken(_) => {
                    (StatusCode::UNAUTHORIZED, "Invalid token".to_string())
                }
                AuthError::NotConfigured | AuthError::Unavailable(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Authentication service unavailable".to_string(),
                ),
            },
            ApiError::Port(err) => match err {
                PortError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found".to_string()),
                PortError::Forbidden => (StatusCode::FORBIDDEN, "Access denied".to_string()),
                PortError::Unavailable(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service unavailable".to_string(),
                ),
                PortError::Unexpected(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                ),
            },
            ApiError::Config(_)
            | ApiError::Database(_)
            | ApiError::Io(_)
            | ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!("request failed: {self}");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}
