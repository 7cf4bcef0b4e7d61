//! Response DTOs for the cache server API
//!
//! Every endpoint answers with the same envelope. `message` is always
//! present; `key` and `value` only on a successful get.

use serde::Serialize;

/// Response status for successful requests
pub const STATUS_OK: &str = "OK";
/// Response status for failed requests
pub const STATUS_ERROR: &str = "ERROR";

/// Response body for all endpoints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    /// `"OK"` or `"ERROR"`
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ApiResponse {
    /// Response for a successful put; wording depends on whether the key existed.
    pub fn stored(existed: bool) -> Self {
        let message = if existed {
            "Key updated successfully"
        } else {
            "Key inserted successfully"
        };
        Self {
            status: STATUS_OK.to_string(),
            message: message.to_string(),
            key: None,
            value: None,
        }
    }

    /// Response for a successful get
    pub fn found(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            message: String::new(),
            key: Some(key.into()),
            value: Some(value.into()),
        }
    }

    /// Error response body
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            message: message.into(),
            key: None,
            value: None,
        }
    }
}
