//! The application route table.
//!
//! One table serves direct HTTP requests and bulk sub-requests alike: a
//! sub-request resolves to exactly the handler a standalone request to the
//! same method and path would get.

use batch::Method;
use shared::routing::{PathParams, PathPattern};

use crate::errors::GatewayError;

/// Handler identifiers, one per operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    SchemaList,
    SchemaGet,
    SchemaPut,
    SettingsGet,
    SettingsPut,
    CredentialsCreate,
    CredentialsLogin,
    CredentialsGet,
    CredentialsDelete,
    CredentialsSetPassword,
    DataGet,
    DataPut,
    DataDelete,
    DataList,
}

struct RouteEntry {
    method: Method,
    pattern: PathPattern,
    endpoint: Endpoint,
}

/// Matches (method, path) to an [`Endpoint`], distinguishing unknown paths
/// (404) from known paths hit with the wrong verb (405).
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        // literal segments before `{param}` captures on the same prefix
        let table: &[(Method, &str, Endpoint)] = &[
            (Method::Get, "/2/schemas", Endpoint::SchemaList),
            (Method::Put, "/2/schemas/{type}", Endpoint::SchemaPut),
            (Method::Get, "/2/schemas/{type}", Endpoint::SchemaGet),
            (Method::Put, "/2/settings/{id}", Endpoint::SettingsPut),
            (Method::Get, "/2/settings/{id}", Endpoint::SettingsGet),
            (Method::Post, "/2/credentials", Endpoint::CredentialsCreate),
            (Method::Post, "/2/credentials/_login", Endpoint::CredentialsLogin),
            (Method::Get, "/2/credentials/_login", Endpoint::CredentialsLogin),
            (
                Method::Post,
                "/2/credentials/{id}/_set_password",
                Endpoint::CredentialsSetPassword,
            ),
            (Method::Get, "/2/credentials/{id}", Endpoint::CredentialsGet),
            (
                Method::Delete,
                "/2/credentials/{id}",
                Endpoint::CredentialsDelete,
            ),
            (Method::Put, "/2/data/{type}/{id}", Endpoint::DataPut),
            (Method::Get, "/2/data/{type}/{id}", Endpoint::DataGet),
            (Method::Delete, "/2/data/{type}/{id}", Endpoint::DataDelete),
            (Method::Get, "/2/data/{type}", Endpoint::DataList),
        ];

        let entries = table
            .iter()
            .map(|(method, pattern, endpoint)| RouteEntry {
                method: *method,
                pattern: PathPattern::parse(pattern),
                endpoint: *endpoint,
            })
            .collect();

        Self { entries }
    }

    pub fn resolve(
        &self,
        method: Method,
        path: &str,
    ) -> Result<(Endpoint, PathParams), GatewayError> {
        let mut path_matched = false;

        for entry in &self.entries {
            if let Some(params) = entry.pattern.capture(path) {
                if entry.method == method {
                    return Ok((entry.endpoint, params));
                }
                path_matched = true;
            }
        }

        if path_matched {
            Err(GatewayError::MethodNotAllowed {
                path: path.to_string(),
            })
        } else {
            Err(GatewayError::NotFound(format!(
                "no endpoint for path [{path}]"
            )))
        }
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}
