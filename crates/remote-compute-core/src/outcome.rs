//! Serializable `{ success, data?, error? }` view of an operation result.

use serde::{Deserialize, Serialize};

/// Flattened operation result for callers that want a plain record.
///
/// Check `success` before trusting `data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> OperationOutcome<T> {
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for OperationOutcome<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failed(e.to_string()),
        }
    }
}
