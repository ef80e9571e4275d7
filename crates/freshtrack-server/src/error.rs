use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors a handler can return, rendered as `{"message": "..."}`
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("{0}")]
    Validation(String),

    #[error("Product not found")]
    NotFound,

    #[error("Failed to send email")]
    Transport(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<freshtrack_core::Error> for AppError {
    fn from(e: freshtrack_core::Error) -> Self {
        use freshtrack_core::Error;

        match e {
            Error::Validation(msg) => AppError::Validation(msg),
            Error::NotFound(_) => AppError::NotFound,
            Error::Transport(e) => AppError::Transport(e.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<freshtrack_store::StoreError> for AppError {
    fn from(e: freshtrack_store::StoreError) -> Self {
        freshtrack_core::Error::from(e).into()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MalformedPayload { .. } | AppError::Validation { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Transport { .. } | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        match &self {
            AppError::Transport(detail) => error!("Error sending email: {}", detail),
            AppError::Internal(detail) => error!("Request failed: {}", detail),
            _ => {}
        }

        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
