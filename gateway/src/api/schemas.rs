//! Schema endpoints. Writes are superadmin-only; reads are open, schemas
//! carry no secrets.

use batch::{Call, CallResponse};
use serde_json::json;

use super::{object_payload, saved};
use crate::context::{RequestContext, Role};
use crate::errors::GatewayError;
use crate::store::Store;

pub fn put(
    store: &Store,
    type_name: &str,
    call: &Call,
    ctx: &RequestContext,
) -> Result<CallResponse, GatewayError> {
    ctx.require(Role::Superadmin)?;
    let mapping = object_payload(call)?;
    let created = store.put_schema(ctx.backend(), type_name, mapping.clone())?;
    Ok(saved("schemas", type_name, created))
}

pub fn get(store: &Store, type_name: &str, ctx: &RequestContext) -> Result<CallResponse, GatewayError> {
    let mapping = store
        .schema(ctx.backend(), type_name)?
        .ok_or_else(|| GatewayError::NotFound(format!("no schema for type [{type_name}]")))?;

    Ok(CallResponse::ok(json!({
        "name": type_name,
        "mapping": mapping,
    })))
}

pub fn list(store: &Store, ctx: &RequestContext) -> Result<CallResponse, GatewayError> {
    let schemas = store.schemas(ctx.backend())?;
    Ok(CallResponse::ok(json!({
        "total": schemas.len(),
        "schemas": schemas,
    })))
}
