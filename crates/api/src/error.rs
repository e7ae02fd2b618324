//! API error type with automatic HTTP status mapping.
//!
//! Every failing endpoint renders the same `ErrorResponse` JSON payload
//! with the matching status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tablecat_domain::{ErrorResponse, TablecatError};

#[derive(Debug)]
pub enum ApiError {
    /// Request validation failed (400)
    BadRequest(String),
    /// Missing or invalid credentials (401)
    Unauthorized(String),
    /// Authenticated but not allowed (403)
    Forbidden(String),
    /// Resource not found (404)
    NotFound(String),
    /// Demo endpoint payload (501)
    NotImplemented,
    /// Everything else (500, logged)
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BadRequest",
            Self::Unauthorized(_) => "Unauthorized",
            Self::Forbidden(_) => "Forbidden",
            Self::NotFound(_) => "NotFound",
            Self::NotImplemented => "NotImplementedError",
            Self::Internal(_) => "InternalServerError",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::BadRequest(message)
            | Self::Unauthorized(message)
            | Self::Forbidden(message)
            | Self::NotFound(message)
            | Self::Internal(message) => message.clone(),
            Self::NotImplemented => "not implemented".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.message(), "request failed");
        } else {
            tracing::warn!(error = %self.message(), status = %status, "request rejected");
        }

        let body = ErrorResponse::new(status.as_u16(), self.name(), self.message());
        (status, Json(body)).into_response()
    }
}

impl From<TablecatError> for ApiError {
    fn from(error: TablecatError) -> Self {
        match error {
            TablecatError::Auth(message) => Self::Unauthorized(message),
            TablecatError::PermissionDenied(message) => Self::Forbidden(message),
            TablecatError::InvalidInput(message) => Self::BadRequest(message),
            TablecatError::NotFound(message) => Self::NotFound(message),
            TablecatError::Database(message)
            | TablecatError::Config(message)
            | TablecatError::Internal(message) => Self::Internal(message),
        }
    }
}
