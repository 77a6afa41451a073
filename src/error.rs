//! Error types for the wrapper pipeline.
//!
//! Defines a unified error type that maps cleanly to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failure reported by a generator adapter.
///
/// Kept apart from model text so a failed call can never be mistaken for
/// output the policy should judge.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Generator request failed: {0}")]
    Request(String),

    #[error("Generator API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Generator returned an empty completion")]
    EmptyResponse,

    #[error("Generator unavailable: {0}")]
    Unavailable(String),
}

/// Unified error type for pipeline operations.
#[derive(Debug, Error)]
pub enum WrapperError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error("Policy inconsistency: {0}")]
    PolicyInconsistency(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body for API clients.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for WrapperError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            WrapperError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), None)
            }
            WrapperError::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                "Configuration error".to_string(),
                Some(msg.clone()),
            ),
            WrapperError::Generator(e) => {
                tracing::error!(error = %e, "Generator failure");
                (
                    StatusCode::BAD_GATEWAY,
                    "GENERATOR_ERROR",
                    "The model could not produce an output".to_string(),
                    Some(e.to_string()),
                )
            }
            WrapperError::PolicyInconsistency(msg) => {
                tracing::error!(error = %msg, "Policy inconsistency");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "POLICY_ERROR",
                    "The safety policy failed to resolve the run".to_string(),
                    Some(msg.clone()),
                )
            }
            WrapperError::Io(e) => {
                // Log the actual error but don't expose internals
                tracing::error!(error = %e, "I/O error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "IO_ERROR",
                    "A storage error occurred".to_string(),
                    None,
                )
            }
            WrapperError::Serialization(e) => {
                // Only raised while encoding run records on our side
                tracing::error!(error = %e, "Serialization error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SERIALIZATION_ERROR",
                    "Failed to encode run record".to_string(),
                    None,
                )
            }
            WrapperError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for pipeline operations.
pub type WrapperResult<T> = Result<T, WrapperError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_error_status() {
        let response = WrapperError::from(GeneratorError::EmptyResponse).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_serialization_error_is_server_side() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let response = WrapperError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_bad_request_status() {
        let response = WrapperError::BadRequest("empty prompt".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
