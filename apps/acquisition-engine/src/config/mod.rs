//! Configuration module for the acquisition engine.
//!
//! Loads YAML with environment variable interpolation and validates it.
//!
//! # Usage
//!
//! ```rust,ignore
//! use acquisition_engine::config::load_config;
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! let rule = config.window.rule()?;
//! ```

mod classifier;
mod observability;
mod remote;
mod retry;
mod settle;
mod sync;
mod window;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::acquisition::RedirectRules;
use crate::domain::slot_config::SlotTable;

pub use classifier::ClassifierConfig;
pub use observability::{LoggingConfig, MetricsConfig, ObservabilityConfig};
pub use remote::RemoteConfig;
pub use retry::RetryConfig;
pub use settle::SettleConfig;
pub use sync::SyncConfig;
pub use window::WindowConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote booking service.
    #[serde(default)]
    pub remote: RemoteConfig,
    /// Reservation window rule.
    #[serde(default)]
    pub window: WindowConfig,
    /// Clock synchronization.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Settle delays and bounded waits.
    #[serde(default)]
    pub settle: SettleConfig,
    /// Response classifier markers.
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Retry limits.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Slot configuration table.
    #[serde(default)]
    pub slots: SlotTable,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Redirect rules from the remote section.
    pub fn redirect_rules(&self) -> Result<RedirectRules, ConfigError> {
        RedirectRules::new(
            &self.remote.confirmation_pattern,
            self.remote.error_redirects.as_slice(),
        )
        .map_err(|e| ConfigError::ValidationError(format!("remote.confirmation_pattern: {e}")))
    }
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |caps: &regex::Captures<'_>| {
        let default_value = caps.get(2).map(|m| m.as_str());
        match caps.get(1).map(|m| std::env::var(m.as_str())) {
            Some(Ok(v)) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.remote.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "remote.base_url must not be empty".to_string(),
        ));
    }

    if !config.remote.candidate_path.contains("{unit}") {
        return Err(ConfigError::ValidationError(
            "remote.candidate_path must contain {unit}".to_string(),
        ));
    }

    if config.remote.request_timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "remote.request_timeout_ms must be positive".to_string(),
        ));
    }

    config.window.rule()?;
    config.redirect_rules()?;

    config
        .classifier
        .marker_table()
        .map_err(|e| ConfigError::ValidationError(format!("classifier.countdown_patterns: {e}")))?;

    if config.sync.probe_count == 0 {
        return Err(ConfigError::ValidationError(
            "sync.probe_count must be at least 1".to_string(),
        ));
    }

    if config.retry.max_retries == 0 {
        return Err(ConfigError::ValidationError(
            "retry.max_retries must be at least 1".to_string(),
        ));
    }

    if config.retry.max_request_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "retry.max_request_attempts must be at least 1".to_string(),
        ));
    }

    if config.slots.rows.is_empty() {
        return Err(ConfigError::ValidationError(
            "slots.rows must not be empty".to_string(),
        ));
    }

    let valid_formats = ["json", "pretty"];
    if !valid_formats.contains(&config.observability.logging.format.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "observability.logging.format must be one of: {valid_formats:?}"
        )));
    }

    Ok(())
}
