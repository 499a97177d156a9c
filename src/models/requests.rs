//! Request DTOs for the storage HTTP API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::cache::{SetOptions, Value};

/// Maximum accepted key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Validates a key taken from the request path.
///
/// Returns an error message if validation fails, None if valid.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        ));
    }
    None
}

/// Request body for PUT /items/:key
///
/// Sentinel strings such as `"[storage date]#1000"` in `value` are decoded
/// into their kind before storing.
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The value to store, as JSON
    pub value: serde_json::Value,
    /// Optional TTL in milliseconds (uses the namespace default if not specified)
    #[serde(default)]
    pub max_age: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

impl SetRequest {
    /// Splits the request into the value and its per-item options.
    pub fn into_parts(self) -> (Value, SetOptions) {
        let options = SetOptions {
            max_age: self.max_age,
            description: self.description,
        };
        (Value::from(self.value), options)
    }
}

/// Request body for PATCH /items/:key
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRequest {
    pub value: serde_json::Value,
}
