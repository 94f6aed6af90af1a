//! Mapping resolver errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::resolver::{ResolveError, TimeoutTier};

/// An error response: a status plus `{"error": reason}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        let status = match &err {
            ResolveError::Validation(_) | ResolveError::QueryTooLarge { .. } => {
                StatusCode::BAD_REQUEST
            }
            ResolveError::PoolExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ResolveError::Timeout {
                tier: TimeoutTier::Request,
                ..
            } => StatusCode::GATEWAY_TIMEOUT,
            ResolveError::Store(_) | ResolveError::Engine(_) | ResolveError::Timeout { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
