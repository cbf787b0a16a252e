//! Settings endpoints. Settings can hold operational secrets, so reads
//! and writes are both superadmin-only.

use batch::{Call, CallResponse};

use super::{object_payload, saved};
use crate::context::{RequestContext, Role};
use crate::errors::GatewayError;
use crate::store::Store;

pub fn put(
    store: &Store,
    id: &str,
    call: &Call,
    ctx: &RequestContext,
) -> Result<CallResponse, GatewayError> {
    ctx.require(Role::Superadmin)?;
    let value = object_payload(call)?;
    let created = store.put_settings(ctx.backend(), id, value.clone())?;
    Ok(saved("settings", id, created))
}

pub fn get(store: &Store, id: &str, ctx: &RequestContext) -> Result<CallResponse, GatewayError> {
    ctx.require(Role::Superadmin)?;
    let value = store
        .settings(ctx.backend(), id)?
        .ok_or_else(|| GatewayError::NotFound(format!("no settings for id [{id}]")))?;
    Ok(CallResponse::ok(value))
}
