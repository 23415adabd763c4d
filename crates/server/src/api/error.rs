//! API error type and core error mapping.
//!
//! Every error leaves the server as `{ "code", "message" }` with a status
//! matching the code.

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::api::types::ErrorResponse;

/// Structured API error returned by handlers.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self { status, body: ErrorResponse { code: code.to_string(), message: message.into() } }
    }
}

/// 400 with code `validation_error`.
pub fn api_validation_error(message: impl Into<String>) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "validation_error", message)
}

/// 404 with code `not_found`.
pub fn api_not_found(message: impl Into<String>) -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "not_found", message)
}

/// 500 with code `internal`. Details stay in the log.
pub fn api_internal(message: &str, err: &buildguide_core::Error) -> ApiError {
    tracing::error!(error = %err, "request failed");
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

impl From<buildguide_core::Error> for ApiError {
    fn from(err: buildguide_core::Error) -> Self {
        use buildguide_core::Error;

        match &err {
            Error::Validation(msg) => api_validation_error(msg.clone()),
            Error::NotFound(msg) => api_not_found(msg.clone()),
            _ => api_internal("internal server error", &err),
        }
    }
}
