//! Error types for vindec-decoder
//!
//! Every API error renders as
//! `{"success": false, "error": {"code": ..., "message": ...}}`.

use crate::services::DecodeError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// VIN failed validation (400)
    #[error("{0}")]
    InvalidVin(String),

    /// No decode source produced data (502)
    #[error("Unable to decode VIN. Please try again.")]
    DecodeUnavailable,

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// vindec-common error
    #[error("Common error: {0}")]
    Common(#[from] vindec_common::Error),
}

impl From<DecodeError> for ApiError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::InvalidVin(e) => ApiError::InvalidVin(e.to_string()),
            DecodeError::Unavailable => ApiError::DecodeUnavailable,
        }
    }
}

/// Unreadable or mistyped JSON bodies use the same envelope as other errors
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::InvalidVin(msg) => (StatusCode::BAD_REQUEST, "INVALID_VIN", msg),
            ApiError::DecodeUnavailable => (
                StatusCode::BAD_GATEWAY,
                "DECODE_UNAVAILABLE",
                ApiError::DecodeUnavailable.to_string(),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
            ApiError::Common(vindec_common::Error::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
            }
            ApiError::Common(vindec_common::Error::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", msg)
            }
            ApiError::Common(ref err) => {
                tracing::error!(error = %err, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
