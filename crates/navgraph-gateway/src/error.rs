//! Error handling for the gateway.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Internal server error.
    #[error("{0}")]
    Internal(String),
    /// Malformed filter, select, or query parameters.
    #[error("{0}")]
    BadRequest(String),
    /// Unknown entity set or navigation property.
    #[error("{0}")]
    NotFound(String),
    /// Backing store failure.
    #[error("{0}")]
    Storage(String),
}

/// Error response body.
#[derive(Serialize)]
pub struct ErrorResponse {
    /// Error flag.
    pub error: bool,
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
}

impl AppError {
    /// Map an engine error, rendering filter errors with a caret under the
    /// offending column of `filter`.
    pub fn from_engine(err: navgraph_core::Error, filter: Option<&str>) -> Self {
        match (err, filter) {
            (navgraph_core::Error::Lang(e), Some(filter)) => {
                AppError::BadRequest(e.format_with_source(filter.trim()))
            }
            (err, _) => err.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::Storage(msg) => (StatusCode::BAD_GATEWAY, "STORAGE_ERROR", msg),
        };

        let body = ErrorResponse {
            error: true,
            code: code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<navgraph_core::Error> for AppError {
    fn from(err: navgraph_core::Error) -> Self {
        use navgraph_core::Error;

        let message = err.to_string();
        match err {
            Error::Lang(_) | Error::Predicate(_) | Error::Config(_) => AppError::BadRequest(message),
            Error::Metadata(_) => AppError::NotFound(message),
            Error::Storage(_) | Error::Sled(_) | Error::Io(_) => AppError::Storage(message),
            Error::State(_) | Error::CollectionInvariant(_) | Error::Serialization(_) => {
                AppError::Internal(message)
            }
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("query task failed: {}", err))
    }
}
