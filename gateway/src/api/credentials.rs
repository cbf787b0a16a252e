//! Credentials endpoints.
//!
//! Sign-up is open to guests; everything else needs at least an
//! authenticated user, and acting on someone else's record needs admin.

use batch::{Call, CallResponse};
use serde::Deserialize;
use serde_json::json;

use super::saved;
use crate::context::{RequestContext, Role};
use crate::errors::GatewayError;
use crate::store::{CredentialsRecord, Store};

const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Deserialize)]
struct CreateRequest {
    username: String,
    password: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct SetPasswordRequest {
    password: String,
}

pub fn create(store: &Store, call: &Call, ctx: &RequestContext) -> Result<CallResponse, GatewayError> {
    let payload = call
        .payload
        .clone()
        .ok_or_else(|| GatewayError::Invalid("request payload is required".to_string()))?;

    let request: CreateRequest = serde_json::from_value(payload)
        .map_err(|e| GatewayError::Invalid(format!("invalid credentials request: {e}")))?;

    let email = request
        .email
        .ok_or_else(|| GatewayError::Invalid("email is required".to_string()))?;

    check_password(&request.password)?;

    let record = store.create_credentials(
        ctx.backend(),
        &request.username,
        &request.password,
        Some(&email),
        Role::User,
    )?;

    Ok(saved("credentials", &record.id, true))
}

pub fn login(ctx: &RequestContext) -> Result<CallResponse, GatewayError> {
    let credentials = ctx.require(Role::User)?;
    Ok(CallResponse::ok(
        json!({"credentials": credentials.to_json()}),
    ))
}

pub fn get(store: &Store, key: &str, ctx: &RequestContext) -> Result<CallResponse, GatewayError> {
    let caller = ctx.require(Role::User)?;
    let record = lookup(store, key, ctx)?;

    if caller.role < Role::Admin && caller.id != record.id {
        return Err(GatewayError::Forbidden(
            "not authorized to access other credentials".to_string(),
        ));
    }

    Ok(CallResponse::ok(record.to_credentials().to_json()))
}

pub fn delete(store: &Store, key: &str, ctx: &RequestContext) -> Result<CallResponse, GatewayError> {
    let caller = ctx.require(Role::User)?;
    let record = lookup(store, key, ctx)?;

    if caller.role < Role::Admin && caller.id != record.id {
        return Err(GatewayError::Forbidden(
            "not authorized to delete other credentials".to_string(),
        ));
    }

    store.delete_credentials(ctx.backend(), &record.id)?;
    Ok(CallResponse::ok(json!({"id": record.id, "type": "credentials"})))
}

pub fn set_password(
    store: &Store,
    key: &str,
    call: &Call,
    ctx: &RequestContext,
) -> Result<CallResponse, GatewayError> {
    let caller = ctx.require(Role::User)?;
    let record = lookup(store, key, ctx)?;

    if caller.role < Role::Admin && caller.id != record.id {
        return Err(GatewayError::Forbidden(
            "not authorized to change other credentials' password".to_string(),
        ));
    }

    let payload = call
        .payload
        .clone()
        .ok_or_else(|| GatewayError::Invalid("request payload is required".to_string()))?;
    let request: SetPasswordRequest = serde_json::from_value(payload)
        .map_err(|e| GatewayError::Invalid(format!("invalid password request: {e}")))?;

    check_password(&request.password)?;

    store.set_password(ctx.backend(), &record.id, &request.password)?;
    Ok(saved("credentials", &record.id, false))
}

fn lookup(store: &Store, key: &str, ctx: &RequestContext) -> Result<CredentialsRecord, GatewayError> {
    store
        .credentials_by_key(ctx.backend(), key)?
        .ok_or_else(|| GatewayError::NotFound(format!("no credentials for [{key}]")))
}

fn check_password(password: &str) -> Result<(), GatewayError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(GatewayError::Invalid(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}
