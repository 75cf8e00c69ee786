//! Parlor Gateway - Main entry point.

use anyhow::Result;
use parlor_common::config::Config;
use parlor_common::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load_with_env()?;
    config.validate()?;

    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
        &config.observability.excluded_targets,
    );

    tracing::info!("Parlor Gateway v{}", env!("CARGO_PKG_VERSION"));

    parlor_gateway::start_server(&config).await
}
