//! immunespace-provider server
//!
//! Reads an optional JSON config file named by `IMMUNESPACE_PROVIDER_CONFIG`,
//! applies environment overrides and serves the API until SIGINT or SIGTERM.

use immunespace_provider::{Config, ImmunespaceProvider, api::start_api_server, shutdown_signal};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const CONFIG_ENV: &str = "IMMUNESPACE_PROVIDER_CONFIG";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("immunespace_provider=info,tower_http=info")),
        )
        .init();

    let mut config = match std::env::var(CONFIG_ENV).ok() {
        Some(path) => Config::from_json_file(&PathBuf::from(path))?,
        None => Config::default(),
    };
    config.apply_env_overrides(|key| std::env::var(key).ok())?;

    tracing::info!(
        data_root = %config.data_root().display(),
        mode = ?config.queue.mode,
        "Starting immunespace-provider"
    );

    let provider = Arc::new(ImmunespaceProvider::new(config.clone()).await?);
    start_api_server(provider.clone(), Arc::new(config), shutdown_signal()).await?;

    provider.shutdown().await?;
    Ok(())
}
