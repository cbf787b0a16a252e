use serde_json::{Value, json};
use std::sync::Arc;

use crate::context::{RequestContext, Role};
use crate::router::Gateway;
use crate::store::Store;

pub const TEST_BACKEND: &str = "test";
pub const SUPERADMIN: &str = "superadmin";
pub const SUPERADMIN_PASSWORD: &str = "hi superadmin";

/// A gateway for one backend with its bootstrap superadmin seeded.
pub fn seeded_gateway() -> Arc<Gateway> {
    let store = Store::new();
    store
        .add_backend(TEST_BACKEND, SUPERADMIN, SUPERADMIN_PASSWORD)
        .unwrap();
    Arc::new(Gateway::new(store))
}

pub fn guest_context() -> RequestContext {
    RequestContext::guest(TEST_BACKEND)
}

pub fn context_for(gateway: &Gateway, username: &str) -> RequestContext {
    let record = gateway
        .store()
        .credentials_by_username(TEST_BACKEND, username)
        .unwrap()
        .unwrap();
    RequestContext::authenticated(TEST_BACKEND, record.to_credentials())
}

/// Creates a user-role identity and returns its context.
pub fn create_user(gateway: &Gateway, username: &str, password: &str) -> RequestContext {
    gateway
        .store()
        .create_credentials(
            TEST_BACKEND,
            username,
            password,
            Some(&format!("{username}@dog.com")),
            Role::User,
        )
        .unwrap();
    context_for(gateway, username)
}

pub fn message_schema() -> Value {
    json!({"properties": {"text": {"type": "text"}}})
}
