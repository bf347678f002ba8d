//! Tracing subscriber bootstrap
//!
//! `QUILL_LOG` (an `EnvFilter` directive) takes priority over the configured level.

use crate::config::LoggingConfig;
use crate::{Error, Result};
use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive
pub const LOG_FILTER_ENV: &str = "QUILL_LOG";

/// Build the filter used by [`init_tracing`]
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_env(LOG_FILTER_ENV) {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            Error::Config(format!("Invalid log level {:?}: {}", config.level, e))
        }),
    }
}

/// Install the global fmt subscriber
///
/// Fails with `Error::Config` if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {}", e)))
}
