//! The ambient credential context.
//!
//! Built once per top-level HTTP request (the one batch-wide
//! authorization event) and then passed explicitly into every handler and
//! every bulk sub-request. No handler re-authenticates; endpoints that
//! derive identity from the request body (`_login` is the identity echo,
//! `_set_password` checks admin-or-self) apply their own rules on top.

use serde_json::{Value, json};
use std::fmt;

use crate::errors::GatewayError;

/// Access levels, in increasing order of privilege.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Guest,
    User,
    Admin,
    Superadmin,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::User => "user",
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated identity within one backend.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
}

impl Credentials {
    /// Wire projection; never includes the password.
    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "username": self.username,
            "email": self.email,
            "role": self.role.as_str(),
        })
    }
}

/// Per-request context: the backend the request is scoped to, plus the
/// authenticated identity, if any. Read-only once built.
#[derive(Clone, Debug)]
pub struct RequestContext {
    backend: String,
    credentials: Option<Credentials>,
}

impl RequestContext {
    pub fn guest(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            credentials: None,
        }
    }

    pub fn authenticated(backend: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            backend: backend.into(),
            credentials: Some(credentials),
        }
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn role(&self) -> Role {
        self.credentials
            .as_ref()
            .map(|c| c.role)
            .unwrap_or(Role::Guest)
    }

    /// Checks the caller holds at least `role`: guests get 401,
    /// under-privileged identities get 403.
    pub fn require(&self, role: Role) -> Result<&Credentials, GatewayError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            GatewayError::Unauthorized("this request requires authentication".to_string())
        })?;

        if credentials.role < role {
            return Err(GatewayError::Forbidden(format!(
                "[{}] role is not authorized, [{role}] is required",
                credentials.role
            )));
        }

        Ok(credentials)
    }
}
