//! Configuration management for cotlog.
//!
//! This module provides a small configuration system that supports:
//! - Loading from YAML files
//! - Environment variable overrides (`COTLOG__SECTION__FIELD`)
//! - Validation of all settings

use crate::error::{ConfigError, Result, MAX_CHUNK_MIB};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::Level;

/// Main application configuration.
///
/// # Examples
///
/// ```no_run
/// use cotlog_core::config::AppConfig;
///
/// let config = AppConfig::from_file("cotlog.yaml").unwrap();
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Event processing settings shared by every pass
    #[serde(default)]
    pub processing: ProcessingConfig,
}

impl AppConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_yaml(&contents)
    }

    /// Loads configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Loads configuration using the `config` crate, layering environment
    /// variables prefixed `COTLOG__` over an optional file.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or merged.
    pub fn from_config_builder<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut builder = config::Config::builder();
        let source = match path {
            Some(p) => {
                let p = p.as_ref();
                builder = builder.add_source(config::File::from(p).required(true));
                p.display().to_string()
            }
            None => "<environment>".to_string(),
        };

        let config = builder
            .add_source(
                config::Environment::with_prefix("COTLOG")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::LoadFailed {
                path: source,
                reason: e.to_string(),
            })?;

        config.try_deserialize().map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        self.logging.parse_level()?;
        self.processing.validate()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "text" or "json"
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    /// Parses the log level string to a tracing Level.
    pub fn parse_level(&self) -> Result<Level> {
        self.level.parse().map_err(|_| {
            ConfigError::invalid_value("logging.level", format!("Invalid log level: {}", self.level))
                .into()
        })
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON format for structured logging
    Json,
}

/// Settings that shape how events are identified and reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Attribute distinguishing one entity's events from another's
    #[serde(default = "default_identity_attribute")]
    pub identity_attribute: String,

    /// Primary time attribute used for dedup keys and the shift reference
    #[serde(default = "default_time_attribute")]
    pub time_attribute: String,

    /// Identity recorded for events that carry none
    #[serde(default = "default_unknown_identity")]
    pub unknown_identity: String,

    /// Report progress every N events
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,

    /// Largest chunk size accepted from callers, in MiB
    #[serde(default = "default_max_chunk_mib")]
    pub max_chunk_mib: u64,
}

fn default_identity_attribute() -> String {
    "uid".to_string()
}

fn default_time_attribute() -> String {
    "time".to_string()
}

fn default_unknown_identity() -> String {
    "UNKNOWN_UID".to_string()
}

fn default_progress_interval() -> usize {
    1000
}

fn default_max_chunk_mib() -> u64 {
    MAX_CHUNK_MIB
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            identity_attribute: default_identity_attribute(),
            time_attribute: default_time_attribute(),
            unknown_identity: default_unknown_identity(),
            progress_interval: default_progress_interval(),
            max_chunk_mib: default_max_chunk_mib(),
        }
    }
}

impl ProcessingConfig {
    /// Validates the processing settings.
    pub fn validate(&self) -> Result<()> {
        if self.identity_attribute.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "processing.identity_attribute",
                "must not be empty",
            )
            .into());
        }

        if self.time_attribute.trim().is_empty() {
            return Err(
                ConfigError::invalid_value("processing.time_attribute", "must not be empty").into(),
            );
        }

        if self.progress_interval == 0 {
            return Err(ConfigError::invalid_value(
                "processing.progress_interval",
                "must be at least 1",
            )
            .into());
        }

        if self.max_chunk_mib == 0 || self.max_chunk_mib > MAX_CHUNK_MIB {
            return Err(ConfigError::invalid_value(
                "processing.max_chunk_mib",
                format!("must be between 1 and {}", MAX_CHUNK_MIB),
            )
            .into());
        }

        Ok(())
    }
}
