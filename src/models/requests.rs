//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;

/// Request body for `POST /put`
///
/// A missing field reads as an empty string; size limits are enforced by
/// the engine.
#[derive(Debug, Clone, Deserialize)]
pub struct PutRequest {
    /// The cache key
    #[serde(default)]
    pub key: String,
    /// The value to store
    #[serde(default)]
    pub value: String,
}

/// Query string for `GET /get`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetQuery {
    #[serde(default)]
    pub key: Option<String>,
}

impl GetQuery {
    /// Returns the key if present and non-empty.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref().filter(|k| !k.is_empty())
    }
}
