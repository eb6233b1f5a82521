//! TOML configuration loading.
//!
//! Any deserializable struct gets `load(path)` through [`ConfigLoader`];
//! the host reads `HalConfig` this way. [`SharedConfig`] is the `[shared]`
//! table that sets the service name and the default log level.
//!
//! ```rust,no_run
//! use rrbot_common::config::ConfigLoader;
//! use rrbot_common::hal::config::HalConfig;
//! use std::path::Path;
//!
//! let config = HalConfig::load(Path::new("config/rrbot_hal.toml"))?;
//! println!("{} -> {}", config.shared.service_name, config.driver);
//! # Ok::<(), rrbot_common::config::ConfigError>(())
//! ```

use crate::hal::consts::HAL_SERVICE_NAME;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure to load a configuration file.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// No file at the given path.
    #[error("Configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The file exists but could not be read.
    #[error("Failed to read {}: {message}", .path.display())]
    ReadError {
        /// File that failed to read
        path: PathBuf,
        /// IO error text
        message: String,
    },

    /// Invalid TOML, or a required key is missing.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Parsed, but a value is out of range.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Default log level, lowercase in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

fn default_service_name() -> String {
    HAL_SERVICE_NAME.to_string()
}

/// The `[shared]` table.
///
/// ```toml
/// [shared]
/// service_name = "rrbot_hal"
/// log_level = "debug"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Default log level when `RUST_LOG` is unset.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Instance name used in startup logs.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl SharedConfig {
    /// Reject an empty `service_name`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

/// `load(path)` for every deserializable type.
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Read and parse a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound(path.to_path_buf()),
            _ => ConfigError::ReadError {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
