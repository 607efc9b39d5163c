use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::rate_limit::RateLimitError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Clients only ever see a coarse kind and a generic message; details are logged.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthenticated")]
    Unauthorized,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Permission denied")]
    Forbidden,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Deadline exceeded after {0}s")]
    DeadlineExceeded(u64),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<RateLimitError> for AppError {
    fn from(err: RateLimitError) -> Self {
        match err {
            RateLimitError::Exceeded { .. } => AppError::RateLimited,
            RateLimitError::InvalidPrincipal => AppError::Unauthorized,
            RateLimitError::Store(e) => AppError::Internal(e),
        }
    }
}

impl AppError {
    /// Stable machine-readable kind, mirrored in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHENTICATED",
            AppError::Validation(_) => "INVALID_ARGUMENT",
            AppError::Forbidden => "PERMISSION_DENIED",
            AppError::RateLimited => "RESOURCE_EXHAUSTED",
            AppError::DeadlineExceeded(_) => "DEADLINE_EXCEEDED",
            AppError::Llm(_) | AppError::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "User must be authenticated".to_string(),
            ),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "User can only access own data".to_string(),
            ),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "AI rate limit exceeded. Please try again later.".to_string(),
            ),
            AppError::DeadlineExceeded(secs) => {
                tracing::error!("Request abandoned after {secs}s deadline");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "The operation took too long. Please try again later.".to_string(),
                )
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Operation failed".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Operation failed".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
