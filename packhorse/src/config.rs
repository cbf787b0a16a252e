use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    Load(#[from] std::io::Error),

    #[error("could not parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Validation(#[from] ValidationError),
}

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("No backends configured")]
    NoBackends,

    #[error("Empty backend id")]
    EmptyBackendId,

    #[error("Backend id must be a single DNS label: {0}")]
    InvalidBackendId(String),

    #[error("Duplicate backend id: {0}")]
    DuplicateBackend(String),

    #[error("Bulk request limit cannot be 0")]
    InvalidBulkLimit,
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Main listener for API requests
    pub listener: Listener,
    /// Admin listener for health/readiness endpoints
    pub admin_listener: Listener,
    /// Backends served by this instance, resolved from the Host header
    pub backends: Vec<BackendConfig>,
    /// Bulk dispatch tuning
    #[serde(default)]
    pub bulk: BulkConfig,
    /// Optional statsd metrics export
    #[serde(default)]
    pub metrics: Option<MetricsConfig>,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: Config = serde_yaml::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.backends.is_empty() {
            return Err(ValidationError::NoBackends);
        }

        let mut ids = HashSet::new();
        for backend in &self.backends {
            if backend.id.is_empty() {
                return Err(ValidationError::EmptyBackendId);
            }
            if backend.id.contains(['.', ':', '/']) {
                return Err(ValidationError::InvalidBackendId(backend.id.clone()));
            }
            if !ids.insert(&backend.id) {
                return Err(ValidationError::DuplicateBackend(backend.id.clone()));
            }
        }

        if self.bulk.max_calls == 0 {
            return Err(ValidationError::InvalidBulkLimit);
        }

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// One tenant backend and its bootstrap identity.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct BackendConfig {
    /// Backend id; matched against the first label of the Host header
    pub id: String,
    pub superadmin: SuperadminConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SuperadminConfig {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct BulkConfig {
    /// Maximum sub-requests per bulk request
    #[serde(default = "default_max_calls")]
    pub max_calls: usize,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            max_calls: default_max_calls(),
        }
    }
}

fn default_max_calls() -> usize {
    batch::DEFAULT_CALL_LIMIT
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}
