//! Data object endpoints.
//!
//! Access to a type requires an authenticated user and an existing schema
//! for that type; there is nothing to read or write behind an undeclared
//! type, and exposing which types exist to guests is not acceptable, so
//! the failure is 403, not 404.

use batch::{Call, CallResponse};
use serde_json::json;

use super::{object_payload, param_bool};
use crate::context::{Credentials, RequestContext, Role};
use crate::errors::GatewayError;
use crate::store::Store;

pub fn put(
    store: &Store,
    type_name: &str,
    id: &str,
    call: &Call,
    ctx: &RequestContext,
) -> Result<CallResponse, GatewayError> {
    let caller = check_type_access(store, type_name, ctx)?;
    let source = object_payload(call)?;

    // strict writes are create-only
    let create_only = param_bool(call, "strict")?;

    let (version, created) = store.put_object(
        ctx.backend(),
        type_name,
        id,
        source.clone(),
        &caller.username,
        create_only,
    )?;

    let content = json!({"id": id, "type": type_name, "version": version});
    Ok(if created {
        CallResponse::created(content)
    } else {
        CallResponse::ok(content)
    })
}

pub fn get(
    store: &Store,
    type_name: &str,
    id: &str,
    ctx: &RequestContext,
) -> Result<CallResponse, GatewayError> {
    check_type_access(store, type_name, ctx)?;

    let object = store
        .object(ctx.backend(), type_name, id)?
        .ok_or_else(|| GatewayError::NotFound(format!("no object [{type_name}/{id}]")))?;

    Ok(CallResponse::ok(json!({
        "id": id,
        "type": type_name,
        "version": object.version,
        "source": object.source,
    })))
}

pub fn list(
    store: &Store,
    type_name: &str,
    call: &Call,
    ctx: &RequestContext,
) -> Result<CallResponse, GatewayError> {
    check_type_access(store, type_name, ctx)?;

    // accepted for API compatibility; an in-memory store is always fresh
    let _refresh = param_bool(call, "refresh")?;

    let objects = store.list_objects(ctx.backend(), type_name)?;
    let objects: Vec<_> = objects
        .into_iter()
        .map(|(id, object)| {
            json!({"id": id, "version": object.version, "source": object.source})
        })
        .collect();

    Ok(CallResponse::ok(json!({
        "total": objects.len(),
        "objects": objects,
    })))
}

pub fn delete(
    store: &Store,
    type_name: &str,
    id: &str,
    ctx: &RequestContext,
) -> Result<CallResponse, GatewayError> {
    let caller = check_type_access(store, type_name, ctx)?;

    let object = store
        .object(ctx.backend(), type_name, id)?
        .ok_or_else(|| GatewayError::NotFound(format!("no object [{type_name}/{id}]")))?;

    if caller.role < Role::Admin && object.owner != caller.username {
        return Err(GatewayError::Forbidden(format!(
            "not authorized to delete object [{type_name}/{id}]"
        )));
    }

    store.delete_object(ctx.backend(), type_name, id)?;
    Ok(CallResponse::ok(json!({"id": id, "type": type_name})))
}

fn check_type_access(
    store: &Store,
    type_name: &str,
    ctx: &RequestContext,
) -> Result<Credentials, GatewayError> {
    let caller = ctx.require(Role::User)?.clone();

    if store.schema(ctx.backend(), type_name)?.is_none() {
        return Err(GatewayError::Forbidden(format!(
            "no access to data type [{type_name}]"
        )));
    }

    Ok(caller)
}
