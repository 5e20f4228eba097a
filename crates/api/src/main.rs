//! RouteSafe Backend - Main Entry Point

use api::{init_logging, run_server, ServiceConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServiceConfig::load()?;
    init_logging(&config.log)?;

    info!("=== RouteSafe Backend v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Starting road damage detection service...");

    run_server(config).await?;

    Ok(())
}
