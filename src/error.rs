//! Error types for the storage layer
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Storage Error Enum ==
/// Unified error type for the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    /// No usable entry for the key
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Entry present but its TTL elapsed
    #[error("Key outdated: {0}")]
    Outdated(String),

    /// None of the preferred drivers can run here
    #[error("No supported backend: {0}")]
    BackendUnsupported(String),

    /// Backend operation failed
    #[error("Backend error: {0}")]
    Backend(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Snapshot or backend document could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error from a file-backed store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// == IntoResponse Implementation ==
impl IntoResponse for StorageError {
    fn into_response(self) -> Response {
        let status = match &self {
            StorageError::NotFound(_) | StorageError::Outdated(_) => StatusCode::NOT_FOUND,
            StorageError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            StorageError::BackendUnsupported(_) => StatusCode::SERVICE_UNAVAILABLE,
            StorageError::Backend(_) | StorageError::Serialization(_) | StorageError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the storage layer.
pub type Result<T> = std::result::Result<T, StorageError>;
