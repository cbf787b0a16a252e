//! Endpoint handlers.
//!
//! Handlers return `Result<CallResponse, GatewayError>`: the `Ok` side is
//! the response, the `Err` side the application error taxonomy. Whether an
//! error becomes an HTTP response or a per-slot bulk outcome is the
//! caller's concern, not the handler's.

pub mod credentials;
pub mod data;
pub mod schemas;
pub mod settings;

use batch::{Call, CallResponse};
use serde_json::{Value, json};

use crate::errors::GatewayError;

/// The standard write acknowledgement: `{"id", "type"}`, 201 on create
/// and 200 on update.
pub(crate) fn saved(type_name: &str, id: &str, created: bool) -> CallResponse {
    let content = json!({"id": id, "type": type_name});
    if created {
        CallResponse::created(content)
    } else {
        CallResponse::ok(content)
    }
}

/// Reads an optional boolean param; accepts JSON booleans and the strings
/// `"true"`/`"false"` (query strings arrive as strings). Absent means
/// false.
pub(crate) fn param_bool(call: &Call, name: &str) -> Result<bool, GatewayError> {
    match call.param(name) {
        None => Ok(false),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(Value::String(s)) => s.parse().map_err(|_| {
            GatewayError::Invalid(format!("param [{name}] is not a boolean: {s:?}"))
        }),
        Some(other) => Err(GatewayError::Invalid(format!(
            "param [{name}] is not a boolean: {other}"
        ))),
    }
}

/// The request payload, which must be a JSON object.
pub(crate) fn object_payload<'a>(call: &'a Call) -> Result<&'a Value, GatewayError> {
    match &call.payload {
        Some(payload) if payload.is_object() => Ok(payload),
        Some(_) => Err(GatewayError::Invalid(
            "request payload must be a JSON object".to_string(),
        )),
        None => Err(GatewayError::Invalid(
            "request payload is required".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batch::Method;

    #[test]
    fn test_param_bool_accepts_bool_and_string() {
        let call = Call::new(Method::Get, "/2/x")
            .with_param("a", json!(true))
            .with_param("b", json!("false"))
            .with_param("c", json!(1));

        assert!(param_bool(&call, "a").unwrap());
        assert!(!param_bool(&call, "b").unwrap());
        assert!(!param_bool(&call, "missing").unwrap());
        assert!(param_bool(&call, "c").is_err());
    }

    #[test]
    fn test_object_payload_required() {
        let call = Call::new(Method::Put, "/2/x");
        assert!(object_payload(&call).is_err());

        let call = call.with_payload(json!([1, 2]));
        assert!(object_payload(&call).is_err());

        let call = Call::new(Method::Put, "/2/x").with_payload(json!({"a": 1}));
        assert!(object_payload(&call).is_ok());
    }
}
