//! Error types for the cache server
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ApiResponse;

// == Cache Error Enum ==
/// Unified error type for the cache server.
///
/// Only `Validation` is produced by the engine itself. Absence is never an
/// engine error; the HTTP layer maps it to `NotFound`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key or value exceeds the size bound
    #[error("{0}")]
    Validation(String),

    /// Malformed request (bad body, missing parameter)
    #[error("{0}")]
    InvalidRequest(String),

    /// Key absent or expired
    #[error("{0}")]
    NotFound(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::Validation(_) | CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
        };

        (status, Json(ApiResponse::error(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache server.
pub type Result<T> = std::result::Result<T, CacheError>;
