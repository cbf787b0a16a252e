use clap::Parser;
use gateway::{Gateway, GatewayService, Store};
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;

use config::{Config, MetricsConfig};

#[derive(Parser)]
#[command(
    name = "packhorse",
    about = "Multi-tenant backend platform with bulk request dispatch"
)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "packhorse.yaml")]
    config: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum ServerError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Gateway(#[from] gateway::GatewayError),

    #[error("failed to install metrics exporter: {0}")]
    Metrics(String),
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_file(&cli.config)?;

    if let Some(metrics_config) = &config.metrics {
        install_statsd(metrics_config)?;
    }
    shared::metrics_defs::log_definitions("batch", batch::metrics_defs::ALL_METRICS);
    shared::metrics_defs::log_definitions("gateway", gateway::metrics_defs::ALL_METRICS);

    let store = Store::new();
    for backend in &config.backends {
        store.add_backend(
            &backend.id,
            &backend.superadmin.username,
            &backend.superadmin.password,
        )?;
        tracing::info!(backend = backend.id, "backend registered");
    }

    let gateway = Arc::new(Gateway::new(store));
    let service = GatewayService::new(gateway, config.bulk.max_calls);

    tracing::info!(
        backends = config.backends.len(),
        max_calls = config.bulk.max_calls,
        "starting gateway"
    );

    let admin_task = run_http_service::<_, gateway::GatewayError>(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::new(|| true),
    );
    let gateway_task = run_http_service(&config.listener.host, config.listener.port, service);

    tokio::select! {
        result = gateway_task => result?,
        result = admin_task => result?,
    }
    Ok(())
}

fn install_statsd(config: &MetricsConfig) -> Result<(), ServerError> {
    let recorder = metrics_exporter_statsd::StatsdBuilder::from(
        &config.statsd_host,
        config.statsd_port,
    )
    .build(Some("packhorse"))
    .map_err(|e| ServerError::Metrics(e.to_string()))?;

    metrics::set_global_recorder(recorder).map_err(|e| ServerError::Metrics(e.to_string()))?;
    Ok(())
}
