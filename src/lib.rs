pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod transfer;

use std::io::IsTerminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use config::{Config, MigrationConfig, RegistryEndpoint};
pub use error::{Error, Result};
pub use transfer::{Anomaly, TransferPipeline, TransferReport};

/// Initialize the tracing subscriber for logging
/// Uses fmt output in a terminal, journald when started without one (e.g. from a timer unit)
pub fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gitlab_pkg_migrate=info".into());

    if std::io::stdout().is_terminal() {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
        return;
    }

    match tracing_journald::layer() {
        Ok(journald) => tracing_subscriber::registry()
            .with(env_filter)
            .with(journald)
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .init(),
    }
}

/// Run one migration pass with an already loaded configuration
pub async fn run_migration(config: &Config) -> Result<TransferReport> {
    tracing::info!(
        source = %config.source.base_address,
        source_project = %config.source.project_id,
        destination = %config.destination.base_address,
        destination_project = %config.destination.project_id,
        dry_run = config.migration.dry_run,
        "Starting package migration"
    );

    let pipeline = TransferPipeline::new(config)?;
    pipeline.run().await
}
