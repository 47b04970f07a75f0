//! TOML-based configuration for swarm-research
//!
//! This module provides declarative configuration for the research pipeline,
//! the coordinator's retention policy, the generation gateway, per-source
//! instruction templates and logging via a TOML file (`swarm.toml`).
//!
//! Every table and field is optional; an empty file yields the defaults.
//! Use `SwarmConfigManager` for thread-safe access to the current configuration.

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::types::Source;

/// Placeholder substituted with the sub-query in instruction templates.
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// Root configuration structure loaded from swarm.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwarmConfig {
    #[serde(default)]
    pub research: ResearchConfig,

    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Per-source instruction template overrides, keyed by source name
    #[serde(default)]
    pub templates: HashMap<String, String>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

// ============= Research Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Number of sub-tasks every query is decomposed into
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Overall deadline for the dispatch phase; unset means wait indefinitely
    #[serde(default)]
    pub deadline_secs: Option<u64>,

    /// Maximum characters of each result shown in the results summary
    #[serde(default = "default_summary_prefix_chars")]
    pub summary_prefix_chars: usize,
}

fn default_batch_size() -> usize {
    3
}

fn default_summary_prefix_chars() -> usize {
    100
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            deadline_secs: None,
            summary_prefix_chars: default_summary_prefix_chars(),
        }
    }
}

impl ResearchConfig {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

// ============= Coordinator Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Maximum number of query batches kept for lookup
    #[serde(default = "default_max_retained_queries")]
    pub max_retained_queries: usize,
}

fn default_max_retained_queries() -> usize {
    256
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_retained_queries: default_max_retained_queries(),
        }
    }
}

// ============= Gateway Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Timeout applied to every backend request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ============= Logging Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),
}

impl SwarmConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SwarmConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.research.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "research.batch_size must be at least 1".to_string(),
            ));
        }

        if self.research.deadline_secs == Some(0) {
            return Err(ConfigError::ValidationError(
                "research.deadline_secs must be greater than 0 when set".to_string(),
            ));
        }

        if self.research.summary_prefix_chars == 0 {
            return Err(ConfigError::ValidationError(
                "research.summary_prefix_chars must be at least 1".to_string(),
            ));
        }

        if self.coordinator.max_retained_queries == 0 {
            return Err(ConfigError::ValidationError(
                "coordinator.max_retained_queries must be at least 1".to_string(),
            ));
        }

        if self.gateway.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        for (source, template) in &self.templates {
            source.parse::<Source>().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "template configured for unknown source '{}'",
                    source
                ))
            })?;

            if !template.contains(QUERY_PLACEHOLDER) {
                return Err(ConfigError::ValidationError(format!(
                    "template for source '{}' must contain the {} placeholder",
                    source, QUERY_PLACEHOLDER
                )));
            }
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "logging.level must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the template override for a source
    pub fn get_template(&self, source: Source) -> Option<&str> {
        self.templates
            .iter()
            .find(|(name, _)| name.parse::<Source>().ok() == Some(source))
            .map(|(_, template)| template.as_str())
    }
}

// ============= Configuration Manager =============

/// Thread-safe configuration manager with lock-free reads and manual reload
pub struct SwarmConfigManager {
    config: Arc<ArcSwap<SwarmConfig>>,
    config_path: Option<PathBuf>,
}

impl SwarmConfigManager {
    /// Create a new configuration manager and load the initial config
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let config = SwarmConfig::load(&path)?;

        Ok(Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: Some(path),
        })
    }

    /// Create a config manager directly from a config (useful for testing).
    /// `reload` is a no-op for managers built this way.
    pub fn from_config(config: SwarmConfig) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: None,
        }
    }

    /// Get the current configuration (lockless read)
    pub fn config(&self) -> Arc<SwarmConfig> {
        self.config.load_full()
    }

    /// Reload the configuration from disk; the previous config stays active on error
    pub fn reload(&self) -> Result<(), ConfigError> {
        let Some(path) = &self.config_path else {
            return Ok(());
        };

        info!("Reloading configuration from {:?}", path);
        let new_config = SwarmConfig::load(path)?;
        self.config.store(Arc::new(new_config));
        info!("Configuration reloaded successfully");
        Ok(())
    }
}

impl Clone for SwarmConfigManager {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            config_path: self.config_path.clone(),
        }
    }
}
