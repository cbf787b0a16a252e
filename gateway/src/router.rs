//! The in-process request router.
//!
//! [`Gateway`] implements [`CallRouter`]: it resolves a call against the
//! application route table and runs the matching handler under the
//! caller's context. Expected failures come back as status-carrying
//! responses; only faults (poisoned locks, broken invariants) use the
//! error channel, which the bulk dispatcher turns into a generic 500.

use async_trait::async_trait;
use batch::{Call, CallResponse, CallRouter};
use shared::routing::PathParams;

use crate::BULK_PATH;
use crate::api;
use crate::context::RequestContext;
use crate::errors::GatewayError;
use crate::routes::{Endpoint, RouteTable};
use crate::store::Store;

pub struct Gateway {
    store: Store,
    routes: RouteTable,
}

impl Gateway {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            routes: RouteTable::new(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    fn handle(&self, call: &Call, ctx: &RequestContext) -> Result<CallResponse, GatewayError> {
        let (endpoint, params) = self.routes.resolve(call.method, &call.path)?;
        let store = &self.store;

        match endpoint {
            Endpoint::SchemaList => api::schemas::list(store, ctx),
            Endpoint::SchemaGet => api::schemas::get(store, path_param(&params, "type")?, ctx),
            Endpoint::SchemaPut => {
                api::schemas::put(store, path_param(&params, "type")?, call, ctx)
            }
            Endpoint::SettingsGet => api::settings::get(store, path_param(&params, "id")?, ctx),
            Endpoint::SettingsPut => {
                api::settings::put(store, path_param(&params, "id")?, call, ctx)
            }
            Endpoint::CredentialsCreate => api::credentials::create(store, call, ctx),
            Endpoint::CredentialsLogin => api::credentials::login(ctx),
            Endpoint::CredentialsGet => {
                api::credentials::get(store, path_param(&params, "id")?, ctx)
            }
            Endpoint::CredentialsDelete => {
                api::credentials::delete(store, path_param(&params, "id")?, ctx)
            }
            Endpoint::CredentialsSetPassword => {
                api::credentials::set_password(store, path_param(&params, "id")?, call, ctx)
            }
            Endpoint::DataGet => api::data::get(
                store,
                path_param(&params, "type")?,
                path_param(&params, "id")?,
                ctx,
            ),
            Endpoint::DataPut => api::data::put(
                store,
                path_param(&params, "type")?,
                path_param(&params, "id")?,
                call,
                ctx,
            ),
            Endpoint::DataDelete => api::data::delete(
                store,
                path_param(&params, "type")?,
                path_param(&params, "id")?,
                ctx,
            ),
            Endpoint::DataList => {
                api::data::list(store, path_param(&params, "type")?, call, ctx)
            }
        }
    }
}

fn path_param<'a>(params: &'a PathParams, name: &str) -> Result<&'a str, GatewayError> {
    params
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| GatewayError::Internal(format!("missing route param [{name}]")))
}

#[async_trait]
impl CallRouter for Gateway {
    type Context = RequestContext;
    type Error = GatewayError;

    async fn execute(
        &self,
        call: &Call,
        ctx: &RequestContext,
    ) -> Result<CallResponse, GatewayError> {
        // the bulk endpoint must not re-enter itself
        if call.path.trim_end_matches('/') == BULK_PATH {
            return Ok(CallResponse::error(
                400,
                "bulk-nested-call",
                "bulk requests cannot be nested",
            ));
        }

        match self.handle(call, ctx) {
            Ok(response) => Ok(response),
            Err(e) if e.is_internal() => Err(e),
            Err(e) => {
                tracing::debug!(call = %call, error = %e, "request failed");
                Ok(CallResponse::error(
                    e.status().as_u16(),
                    e.code(),
                    &e.to_string(),
                ))
            }
        }
    }
}
