//! HTTP error types for the gateway.
//!
//! Bodies are short plain-text messages. Storage and generator failures are
//! logged here and answered with a generic 500 so backend details never
//! reach the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use loggate_authn::AuthError;
use loggate_log::{LogError, ValidationError};
use loggate_storage::StorageError;
use thiserror::Error;

/// Error wrapper for converting gateway failures to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or wrong shared secret.
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    /// Request body is not a valid log entry.
    #[error("invalid data: {0}")]
    InvalidData(#[from] ValidationError),

    /// HTTP method not served on this path.
    #[error("invalid method")]
    InvalidMethod,

    /// The log store failed.
    #[error(transparent)]
    Log(#[from] LogError),
}

impl ApiError {
    /// Status code for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::InvalidData(_) | Self::Log(LogError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::InvalidMethod => StatusCode::METHOD_NOT_ALLOWED,
            Self::Log(LogError::Storage(StorageError::SizeLimitExceeded { .. })) => {
                StatusCode::PAYLOAD_TOO_LARGE
            },
            Self::Log(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match status {
            StatusCode::UNAUTHORIZED => "Unauthorized",
            StatusCode::BAD_REQUEST => "Invalid data",
            StatusCode::METHOD_NOT_ALLOWED => "Invalid method",
            StatusCode::PAYLOAD_TOO_LARGE => "Payload too large",
            _ => "Internal server error",
        };

        match &self {
            Self::Log(LogError::Storage(err)) if status.is_server_error() => {
                tracing::error!(error = %err, transient = err.is_transient(), "log store failure");
            },
            Self::Log(err) if status.is_server_error() => {
                tracing::error!(error = %err, "log store failure");
            },
            Self::Unauthorized(err) => tracing::debug!(reason = %err, "request rejected"),
            other => tracing::debug!(error = %other, "request rejected"),
        }

        (status, body).into_response()
    }
}
