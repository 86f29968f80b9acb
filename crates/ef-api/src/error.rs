//! Error types for ef-api
//!
//! Errors render as `{"detail": "..."}` JSON bodies, the wire shape the
//! service has always exposed.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// ef-api error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    SchedulingFailed(&'static str),

    #[error("Store error: {0}")]
    Store(#[from] ef_core::Error),

    #[error("Facebook error: {0}")]
    Facebook(#[from] ef_facebook::FacebookError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.to_string()),
            ApiError::SchedulingFailed(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg.to_string())
            }
            ApiError::Store(e) => {
                error!("Store error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::Facebook(e) => {
                error!("Facebook error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;
