//! In-memory multi-tenant state.
//!
//! Stands in for the storage engine behind the API: schemas, settings,
//! credentials, and versioned data objects, each scoped to one backend.
//! Locks are held per operation only; a poisoned lock is the canonical
//! unexpected fault and surfaces as a 500 through the dispatcher.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::context::{Credentials, Role};
use crate::errors::GatewayError;

/// A stored data object. `version` starts at 1 and increments on update.
#[derive(Clone, Debug)]
pub struct DataObject {
    pub source: Value,
    pub version: u64,
    pub owner: String,
}

/// A stored identity record.
#[derive(Clone, Debug)]
pub struct CredentialsRecord {
    pub id: String,
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub role: Role,
}

impl CredentialsRecord {
    pub fn to_credentials(&self) -> Credentials {
        Credentials {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

#[derive(Default)]
struct BackendState {
    schemas: BTreeMap<String, Value>,
    settings: BTreeMap<String, Value>,
    credentials: BTreeMap<String, CredentialsRecord>,
    objects: BTreeMap<(String, String), DataObject>,
    next_credentials_id: u64,
}

/// All backends' state behind one lock.
#[derive(Default)]
pub struct Store {
    backends: RwLock<HashMap<String, BackendState>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a backend and seeds its bootstrap superadmin.
    pub fn add_backend(
        &self,
        backend: &str,
        superadmin_username: &str,
        superadmin_password: &str,
    ) -> Result<(), GatewayError> {
        {
            let mut backends = self.write()?;
            backends.entry(backend.to_string()).or_default();
        }
        self.create_credentials(
            backend,
            superadmin_username,
            superadmin_password,
            None,
            Role::Superadmin,
        )?;
        Ok(())
    }

    pub fn has_backend(&self, backend: &str) -> Result<bool, GatewayError> {
        Ok(self.read()?.contains_key(backend))
    }

    //
    // schemas
    //

    /// Returns true when the schema was created, false when updated.
    pub fn put_schema(
        &self,
        backend: &str,
        name: &str,
        mapping: Value,
    ) -> Result<bool, GatewayError> {
        self.with_backend_mut(backend, |state| {
            Ok(state.schemas.insert(name.to_string(), mapping).is_none())
        })
    }

    pub fn schema(&self, backend: &str, name: &str) -> Result<Option<Value>, GatewayError> {
        self.with_backend(backend, |state| Ok(state.schemas.get(name).cloned()))
    }

    pub fn schemas(&self, backend: &str) -> Result<BTreeMap<String, Value>, GatewayError> {
        self.with_backend(backend, |state| Ok(state.schemas.clone()))
    }

    //
    // settings
    //

    pub fn put_settings(
        &self,
        backend: &str,
        id: &str,
        value: Value,
    ) -> Result<bool, GatewayError> {
        self.with_backend_mut(backend, |state| {
            Ok(state.settings.insert(id.to_string(), value).is_none())
        })
    }

    pub fn settings(&self, backend: &str, id: &str) -> Result<Option<Value>, GatewayError> {
        self.with_backend(backend, |state| Ok(state.settings.get(id).cloned()))
    }

    //
    // credentials
    //

    pub fn create_credentials(
        &self,
        backend: &str,
        username: &str,
        password: &str,
        email: Option<&str>,
        role: Role,
    ) -> Result<CredentialsRecord, GatewayError> {
        self.with_backend_mut(backend, |state| {
            if state
                .credentials
                .values()
                .any(|record| record.username == username)
            {
                return Err(GatewayError::Invalid(format!(
                    "username [{username}] already in use"
                )));
            }

            state.next_credentials_id += 1;
            let record = CredentialsRecord {
                id: state.next_credentials_id.to_string(),
                username: username.to_string(),
                password: password.to_string(),
                email: email.map(str::to_string),
                role,
            };
            state
                .credentials
                .insert(record.id.clone(), record.clone());
            Ok(record)
        })
    }

    pub fn credentials_by_username(
        &self,
        backend: &str,
        username: &str,
    ) -> Result<Option<CredentialsRecord>, GatewayError> {
        self.with_backend(backend, |state| {
            Ok(state
                .credentials
                .values()
                .find(|record| record.username == username)
                .cloned())
        })
    }

    /// Looks a record up by id, falling back to username.
    pub fn credentials_by_key(
        &self,
        backend: &str,
        key: &str,
    ) -> Result<Option<CredentialsRecord>, GatewayError> {
        self.with_backend(backend, |state| {
            Ok(state
                .credentials
                .get(key)
                .or_else(|| {
                    state
                        .credentials
                        .values()
                        .find(|record| record.username == key)
                })
                .cloned())
        })
    }

    pub fn delete_credentials(&self, backend: &str, id: &str) -> Result<bool, GatewayError> {
        self.with_backend_mut(backend, |state| Ok(state.credentials.remove(id).is_some()))
    }

    pub fn set_password(
        &self,
        backend: &str,
        id: &str,
        password: &str,
    ) -> Result<bool, GatewayError> {
        self.with_backend_mut(backend, |state| {
            match state.credentials.get_mut(id) {
                Some(record) => {
                    record.password = password.to_string();
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    //
    // data objects
    //

    /// Writes an object, returning its new version and whether it was
    /// created. With `create_only`, overwriting an existing object is a
    /// conflict.
    pub fn put_object(
        &self,
        backend: &str,
        type_name: &str,
        id: &str,
        source: Value,
        owner: &str,
        create_only: bool,
    ) -> Result<(u64, bool), GatewayError> {
        self.with_backend_mut(backend, |state| {
            let key = (type_name.to_string(), id.to_string());
            match state.objects.get_mut(&key) {
                Some(object) => {
                    if create_only {
                        return Err(GatewayError::Conflict(format!(
                            "object [{type_name}/{id}] already exists"
                        )));
                    }
                    object.source = source;
                    object.version += 1;
                    Ok((object.version, false))
                }
                None => {
                    state.objects.insert(
                        key,
                        DataObject {
                            source,
                            version: 1,
                            owner: owner.to_string(),
                        },
                    );
                    Ok((1, true))
                }
            }
        })
    }

    pub fn object(
        &self,
        backend: &str,
        type_name: &str,
        id: &str,
    ) -> Result<Option<DataObject>, GatewayError> {
        self.with_backend(backend, |state| {
            Ok(state
                .objects
                .get(&(type_name.to_string(), id.to_string()))
                .cloned())
        })
    }

    pub fn delete_object(
        &self,
        backend: &str,
        type_name: &str,
        id: &str,
    ) -> Result<bool, GatewayError> {
        self.with_backend_mut(backend, |state| {
            Ok(state
                .objects
                .remove(&(type_name.to_string(), id.to_string()))
                .is_some())
        })
    }

    /// All objects of one type, sorted by id.
    pub fn list_objects(
        &self,
        backend: &str,
        type_name: &str,
    ) -> Result<Vec<(String, DataObject)>, GatewayError> {
        self.with_backend(backend, |state| {
            Ok(state
                .objects
                .iter()
                .filter(|((object_type, _), _)| object_type == type_name)
                .map(|((_, id), object)| (id.clone(), object.clone()))
                .collect())
        })
    }

    //
    // lock plumbing
    //

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, BackendState>>, GatewayError> {
        self.backends
            .read()
            .map_err(|_| GatewayError::Internal("store lock poisoned".to_string()))
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, BackendState>>, GatewayError> {
        self.backends
            .write()
            .map_err(|_| GatewayError::Internal("store lock poisoned".to_string()))
    }

    fn with_backend<T>(
        &self,
        backend: &str,
        f: impl FnOnce(&BackendState) -> Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        let backends = self.read()?;
        let state = backends
            .get(backend)
            .ok_or_else(|| GatewayError::Internal(format!("unknown backend [{backend}]")))?;
        f(state)
    }

    fn with_backend_mut<T>(
        &self,
        backend: &str,
        f: impl FnOnce(&mut BackendState) -> Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        let mut backends = self.write()?;
        let state = backends
            .get_mut(backend)
            .ok_or_else(|| GatewayError::Internal(format!("unknown backend [{backend}]")))?;
        f(state)
    }
}
