//! Sensor Telemetry Service - Main Entry Point

use api::{init_logging, run, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    info!("=== Sensor API v{} ===", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load()?;
    info!(
        "Storage: {:?} ({}.{}), retention {}s",
        config.storage_backend,
        config.database_name,
        config.collection_name,
        config.retention_secs
    );

    run(config).await?;

    Ok(())
}
