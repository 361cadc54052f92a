//! The uniform `(success, payload)` result convention.
//!
//! Callers only branch on `success`. Failure payloads are human-readable
//! strings, not structured codes.

use serde::{Deserialize, Serialize};

/// Result of a gateway call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Operation data on success, error description on failure.
    pub payload: serde_json::Value,
}

impl Reply {
    /// Create a successful reply.
    pub fn success(payload: impl Into<serde_json::Value>) -> Self {
        Self {
            success: true,
            payload: payload.into(),
        }
    }

    /// Create a failure reply.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: serde_json::Value::String(message.into()),
        }
    }

    /// The failure message, if this is a failure.
    pub fn error(&self) -> Option<&str> {
        if self.success {
            None
        } else {
            self.payload.as_str()
        }
    }

    /// Unpack into the two-value form.
    pub fn into_parts(self) -> (bool, serde_json::Value) {
        (self.success, self.payload)
    }
}

impl<T, E> From<Result<T, E>> for Reply
where
    T: Serialize,
    E: std::fmt::Display,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => match serde_json::to_value(value) {
                Ok(payload) => Reply::success(payload),
                Err(e) => Reply::failure(format!("failed to encode reply: {e}")),
            },
            Err(e) => Reply::failure(e.to_string()),
        }
    }
}
