//! Web error types for the share backend.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Error type for share API operations.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// Missing or malformed request payload.
    #[error("{0}")]
    BadRequest(String),

    /// Unknown share or route.
    #[error("{0}")]
    NotFound(String),

    /// Store failure; `detail` is passed through to the client.
    #[error("{message} {detail}")]
    Internal {
        message: &'static str,
        detail: String,
    },
}

impl WebError {
    pub fn internal(message: &'static str, err: impl std::fmt::Display) -> Self {
        WebError::Internal {
            message,
            detail: err.to_string(),
        }
    }
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, error, detail) = match self {
            WebError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            WebError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            WebError::Internal { message, detail } => {
                tracing::error!(detail = %detail, "{}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    message.to_string(),
                    Some(detail),
                )
            }
        };

        (status, Json(ErrorResponse { error, detail })).into_response()
    }
}
