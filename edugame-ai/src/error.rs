//! Error types for edugame-ai
//!
//! Every failure carries a kind so callers can tell a bad request from a
//! missing model from a failed inference without string matching. The HTTP
//! layer maps kinds to status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::backends::ModelKind;

/// Service error type
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Bad content, empty text, missing field (400)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Upload content type not accepted (415)
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Audio larger than the upload limit (413)
    #[error("File too large: {size} bytes (max {limit} bytes)")]
    PayloadTooLarge { size: u64, limit: u64 },

    /// Model handle failed to initialise (503)
    #[error("Model unavailable: {model}: {reason}")]
    ModelUnavailable { model: ModelKind, reason: String },

    /// Backend call failed (502)
    #[error("Inference failed: {0}")]
    InferenceFailure(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// edugame-common error
    #[error("Common error: {0}")]
    Common(#[from] edugame_common::Error),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// HTTP status and stable error code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ServiceError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            ServiceError::UnsupportedMediaType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_MEDIA_TYPE")
            }
            ServiceError::PayloadTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE")
            }
            ServiceError::ModelUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "MODEL_UNAVAILABLE")
            }
            ServiceError::InferenceFailure(_) => (StatusCode::BAD_GATEWAY, "INFERENCE_FAILURE"),
            ServiceError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            ServiceError::Common(_) => (StatusCode::INTERNAL_SERVER_ERROR, "COMMON_ERROR"),
            ServiceError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!(code = error_code, "{}", self);
        } else {
            tracing::debug!(code = error_code, "{}", self);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ServiceError>;
