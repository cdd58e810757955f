//! Request-level errors and their HTTP mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use catalog_core::CoreError;
use serde_json::json;
use thiserror::Error;

use crate::upstream::UpstreamError;

/// Errors surfaced to API clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    InvalidQuery(#[from] CoreError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidQuery(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::InvalidQuery(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream(e) => e.status_code(),
        }
    }

    /// Client-facing message. Transport details stay in the logs.
    fn message(&self) -> String {
        match self {
            Self::InvalidQuery(e) => e.to_string(),
            Self::Upstream(UpstreamError::Status(_)) => "upstream catalog error".to_string(),
            Self::Upstream(_) => "internal error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": self.message(),
            "status": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}
