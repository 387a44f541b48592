use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("no courier available")]
    NoCourierAvailable,

    #[error("delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Prefixes the message with the operation that failed, keeping the kind.
    pub fn context(self, operation: &str) -> Self {
        match self {
            AppError::NotFound(msg) => AppError::NotFound(format!("{operation}: {msg}")),
            AppError::BadRequest(msg) => AppError::BadRequest(format!("{operation}: {msg}")),
            AppError::PreconditionFailed(msg) => {
                AppError::PreconditionFailed(format!("{operation}: {msg}"))
            }
            AppError::DeliveryFailed(msg) => {
                AppError::DeliveryFailed(format!("{operation}: {msg}"))
            }
            AppError::Internal(msg) => AppError::Internal(format!("{operation}: {msg}")),
            AppError::NoCourierAvailable => AppError::NoCourierAvailable,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::PreconditionFailed(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::NoCourierAvailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "no courier available".to_string(),
            ),
            AppError::DeliveryFailed(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
