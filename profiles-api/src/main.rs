//! Profiles API - Main entry point.

use anyhow::Result;
use profiles_common::config::Config;
use profiles_common::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let loaded = Config::load_with_env()?;
    let config = &loaded.config;

    init_logging(&config.observability.log_level, &config.observability.log_format);
    loaded.log_summary();

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }

    tracing::info!("Profiles API v{}", env!("CARGO_PKG_VERSION"));

    profiles_api::start_server(config).await
}
