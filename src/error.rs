use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// HTTP-facing error kinds. Prompt-enhancement failures never appear here;
/// they are absorbed by the enhancer and only logged.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("image generation failed: {0}")]
    Generation(String),
    #[error("storage failed: {0}")]
    Storage(String),
    #[error("{0}")]
    Unsupported(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Generation(_) | ApiError::Storage(_) | ApiError::Unsupported(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        }
        (status, Json(json!({ "success": false, "error": self.to_string() }))).into_response()
    }
}
