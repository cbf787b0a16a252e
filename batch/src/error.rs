use serde_json::Value;
use thiserror::Error;

/// A malformed sub-request descriptor.
#[derive(Debug, Error, PartialEq)]
pub enum CallError {
    #[error("params expect an even number of [key, value, ...] entries, got {count}")]
    OddParams { count: usize },

    #[error("param keys must be strings, got {key}")]
    ParamKeyNotString { key: Value },

    #[error("call path must be a non-empty absolute path, got {path:?}")]
    InvalidPath { path: String },
}

impl CallError {
    pub const fn code(&self) -> &'static str {
        "malformed-call"
    }

    pub const fn status(&self) -> u16 {
        400
    }
}

/// A structural problem with the bulk request itself.
///
/// Per-call failures are never surfaced here; they stay inside the result
/// as status-carrying [`crate::CallResponse`] values.
#[derive(Debug, Error, PartialEq)]
pub enum DispatchError {
    #[error("bulk requests are limited to {limit} sub-requests, got {size}")]
    LimitExceeded { limit: usize, size: usize },
}

impl DispatchError {
    pub const fn code(&self) -> &'static str {
        match self {
            DispatchError::LimitExceeded { .. } => "bulk-limit-exceeded",
        }
    }

    pub const fn status(&self) -> u16 {
        400
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_exceeded_carries_both_sizes() {
        let err = DispatchError::LimitExceeded { limit: 20, size: 21 };
        assert_eq!(err.code(), "bulk-limit-exceeded");
        assert_eq!(err.status(), 400);
        assert!(err.to_string().contains("20"));
        assert!(err.to_string().contains("21"));
    }

    #[test]
    fn test_call_error_is_bad_request() {
        let err = CallError::OddParams { count: 3 };
        assert_eq!(err.status(), 400);
        assert_eq!(err.code(), "malformed-call");
    }
}
