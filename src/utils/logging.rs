//! Tracing subscriber setup
//!
//! Installs a global `tracing` subscriber built from [`LoggingConfig`]. The
//! `RUST_LOG` environment variable, when set, overrides the configured level.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::toml_config::{ConfigError, LogFormat, LoggingConfig};

/// Build the filter used by [`init_logging`].
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(&config.level).map_err(|e| {
        ConfigError::ValidationError(format!("invalid log level '{}': {}", config.level, e))
    })
}

/// Install the global subscriber.
///
/// Fails instead of panicking when a subscriber is already installed, so
/// embedding applications and tests may call it more than once.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
    };

    result.map_err(|e| ConfigError::LoggingInit(e.to_string()))
}
