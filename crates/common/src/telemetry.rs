//! Tracing subscriber setup

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, LogFormat};

/// Install the global subscriber. Call once, at process start.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_new(&config.rust_log)
        .map_err(|e| anyhow::anyhow!("Invalid RUST_LOG '{}': {}", config.rust_log, e))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match config.log_format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}
