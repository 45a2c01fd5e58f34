use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Failure responses keep the same envelope as successes (`success: false`,
/// empty `sources` and `urls_found`) so clients parse one shape for both.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("No content provided for extraction")]
    NoContent,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Could not resolve input to text: {0}")]
    Resolution(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Upstream service unavailable: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NoContent => (
                StatusCode::BAD_REQUEST,
                "No content provided for extraction".to_string(),
            ),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Resolution(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Could not resolve input to text: {msg}"),
            ),
            AppError::Extraction(msg) => {
                tracing::error!("Extraction failure: {msg}");
                (StatusCode::BAD_GATEWAY, format!("Extraction failed: {msg}"))
            }
            AppError::Upstream(msg) => {
                tracing::warn!("Upstream unavailable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    format!("Upstream service unavailable: {msg}"),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": message,
            "sources": [],
            "urls_found": []
        }));

        (status, body).into_response()
    }
}
