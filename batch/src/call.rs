//! Sub-request descriptor.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::CallError;

/// HTTP verbs accepted for sub-requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl Method {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sub-request inside a bulk request.
///
/// The verb is an attribute, not a type: a bulk body deserializes into a
/// homogeneous `Vec<Call>` whatever mix of verbs it carries.
///
/// # Example
/// ```json
/// {
///   "method": "PUT",
///   "path": "/2/data/message/1",
///   "params": {"strict": true},
///   "payload": {"text": "Hi guys!"}
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Call {
    pub method: Method,

    /// Absolute application path, e.g. `/2/data/message/1`.
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<IndexMap<String, String>>,

    /// Query parameters; insertion order is preserved on the wire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<IndexMap<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Call {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: None,
            params: None,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params
            .get_or_insert_with(IndexMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Adds params from a flat `[key, value, key, value, ...]` list.
    ///
    /// An odd number of entries fails with [`CallError::OddParams`]; keys
    /// must be JSON strings. An empty list is a no-op.
    pub fn with_params(mut self, pairs: &[Value]) -> Result<Self, CallError> {
        if pairs.len() % 2 != 0 {
            return Err(CallError::OddParams { count: pairs.len() });
        }
        for pair in pairs.chunks_exact(2) {
            let key = pair[0]
                .as_str()
                .ok_or_else(|| CallError::ParamKeyNotString {
                    key: pair[0].clone(),
                })?;
            self = self.with_param(key, pair[1].clone());
        }
        Ok(self)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.as_ref().and_then(|headers| {
            headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        })
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.as_ref().and_then(|params| params.get(name))
    }

    /// Checks the path invariants: non-empty and absolute.
    pub fn validate(&self) -> Result<(), CallError> {
        if self.path.is_empty() || !self.path.starts_with('/') {
            return Err(CallError::InvalidPath {
                path: self.path.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_mixed_verbs() {
        let body = json!([
            {"method": "PUT", "path": "/2/data/message/1", "payload": {"text": "hi"}},
            {"method": "GET", "path": "/2/data/message", "params": {"refresh": true}},
            {"method": "DELETE", "path": "/2/data/message/1"}
        ]);

        let calls: Vec<Call> = serde_json::from_value(body).unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].method, Method::Put);
        assert_eq!(calls[0].payload, Some(json!({"text": "hi"})));
        assert_eq!(calls[1].param("refresh"), Some(&json!(true)));
        assert!(calls[2].payload.is_none());
    }

    #[test]
    fn test_unknown_method_rejected() {
        let result: Result<Call, _> =
            serde_json::from_value(json!({"method": "BREW", "path": "/2/x"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_with_params_even() {
        let call = Call::new(Method::Get, "/2/data/message")
            .with_params(&[json!("refresh"), json!(true), json!("size"), json!(10)])
            .unwrap();

        assert_eq!(call.param("refresh"), Some(&json!(true)));
        assert_eq!(call.param("size"), Some(&json!(10)));
    }

    #[test]
    fn test_with_params_empty_is_noop() {
        let call = Call::new(Method::Get, "/2/x").with_params(&[]).unwrap();
        assert!(call.params.is_none());
    }

    #[test]
    fn test_with_params_odd_fails() {
        for count in [1, 3, 5] {
            let pairs: Vec<Value> = (0..count).map(|i| json!(format!("k{i}"))).collect();
            let err = Call::new(Method::Get, "/2/x")
                .with_params(&pairs)
                .unwrap_err();
            assert_eq!(err, CallError::OddParams { count });
        }
    }

    #[test]
    fn test_with_params_non_string_key_fails() {
        let err = Call::new(Method::Get, "/2/x")
            .with_params(&[json!(42), json!("v")])
            .unwrap_err();
        assert!(matches!(err, CallError::ParamKeyNotString { .. }));
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let mut headers = IndexMap::new();
        headers.insert("X-Custom".to_string(), "value".to_string());
        let call = Call {
            headers: Some(headers),
            ..Call::new(Method::Get, "/2/x")
        };

        assert_eq!(call.header("x-custom"), Some("value"));
        assert_eq!(call.header("X-CUSTOM"), Some("value"));
        assert_eq!(call.header("other"), None);
    }

    #[test]
    fn test_validate_path() {
        assert!(Call::new(Method::Get, "/2/data").validate().is_ok());
        assert!(Call::new(Method::Get, "").validate().is_err());
        assert!(Call::new(Method::Get, "2/data").validate().is_err());
    }

    #[test]
    fn test_params_keep_insertion_order() {
        let call = Call::new(Method::Get, "/2/x")
            .with_param("b", json!(1))
            .with_param("a", json!(2));

        let keys: Vec<&String> = call.params.as_ref().unwrap().keys().collect();
        assert_eq!(keys, ["b", "a"]);
    }
}
