//! Sub-request outcome.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// The outcome of one sub-request: an HTTP status and the response body.
///
/// The status is always populated; faults that never produced a response
/// are represented as 500 with a generic error body.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallResponse {
    pub status: u16,

    #[serde(default)]
    pub content: Value,
}

impl CallResponse {
    pub fn new(status: u16, content: Value) -> Self {
        Self { status, content }
    }

    pub fn ok(content: Value) -> Self {
        Self::new(200, content)
    }

    pub fn created(content: Value) -> Self {
        Self::new(201, content)
    }

    /// Builds the canonical error body `{"error": {"code", "message"}}`.
    pub fn error(status: u16, code: &str, message: &str) -> Self {
        Self::new(status, json!({"error": {"code": code, "message": message}}))
    }

    /// The response for faults that escaped the router. Detail stays in the
    /// server log, not in the body.
    pub fn internal_error() -> Self {
        Self::error(500, "internal-error", "unexpected server error")
    }

    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    /// The JSON value this response contributes to a named-mode result:
    /// the content itself on success, `{"status", "error"}` on failure.
    pub fn named_value(&self) -> Value {
        if !self.is_error() {
            return self.content.clone();
        }
        let error = match self.content.get("error") {
            Some(error) => error.clone(),
            None => self.content.clone(),
        };
        json!({"status": self.status, "error": error})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_shape() {
        let response = CallResponse::error(404, "not-found", "no object [message/9]");

        assert!(response.is_error());
        assert_eq!(response.content["error"]["code"], "not-found");
        assert_eq!(response.content["error"]["message"], "no object [message/9]");
    }

    #[test]
    fn test_named_value_success_is_content() {
        let response = CallResponse::ok(json!({"username": "vince"}));
        assert_eq!(response.named_value(), json!({"username": "vince"}));
    }

    #[test]
    fn test_named_value_failure_carries_status() {
        let response = CallResponse::error(404, "not-found", "gone");
        let value = response.named_value();

        assert_eq!(value["status"], 404);
        assert_eq!(value["error"]["code"], "not-found");
    }

    #[test]
    fn test_internal_error_is_generic() {
        let response = CallResponse::internal_error();
        assert_eq!(response.status, 500);
        assert_eq!(response.content["error"]["code"], "internal-error");
    }

    #[test]
    fn test_serialized_shape() {
        let response = CallResponse::ok(json!({"total": 2}));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value, json!({"status": 200, "content": {"total": 2}}));
    }
}
