//! Configuration module for Babel Core.
//!
//! All settings live in one TOML file, `<workspace>/.babel/config.toml`. Every
//! section and field is optional; a missing file yields the defaults.

use babel_models::{CacheConfig, ClientConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::batch::BatchSettings;
use crate::retry::RetrySettings;

/// Directory under the workspace root holding Babel's files.
pub const BABEL_DIR: &str = ".babel";

/// Name of the configuration file inside [`BABEL_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("Failed to parse {}: {source}", path.display())]
    TomlParse {
        /// File that failed.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// A value is out of range.
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Root configuration for Babel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BabelConfig {
    /// Cache tiers and key derivation.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Provider client.
    #[serde(default)]
    pub inference: ClientConfig,
    /// Retry policy.
    #[serde(default)]
    pub retry: RetrySettings,
    /// Batch dispatch.
    #[serde(default)]
    pub batch: BatchSettings,
}

impl BabelConfig {
    /// Parses a configuration from TOML text without validating it.
    ///
    /// # Errors
    /// Returns the TOML error for malformed input.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Validate every section.
    ///
    /// # Errors
    /// Returns `ConfigError::Validation` naming the first invalid section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate().map_err(|e| ConfigError::Validation(format!("[cache] {e}")))?;
        self.retry.validate().map_err(|e| ConfigError::Validation(format!("[retry] {e}")))?;
        self.batch.validate().map_err(|e| ConfigError::Validation(format!("[batch] {e}")))?;
        Ok(())
    }

    /// Location of the durable cache database for `workspace_root`.
    ///
    /// A relative `cache.database` is resolved against the workspace root.
    #[must_use]
    pub fn database_path(&self, workspace_root: &Path) -> PathBuf {
        let database = Path::new(&self.cache.database);
        if database.is_absolute() { database.to_path_buf() } else { workspace_root.join(database) }
    }
}

/// Default configuration file location for `workspace_root`.
#[must_use]
pub fn default_config_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(BABEL_DIR).join(CONFIG_FILE)
}

/// Loads and validates the configuration of `workspace_root`.
///
/// # Errors
/// Returns `ConfigError` if the file exists but cannot be read, parsed, or
/// validated.
pub fn load_config(workspace_root: &Path) -> Result<BabelConfig, ConfigError> {
    load_config_from(&default_config_path(workspace_root))
}

/// Loads and validates the configuration file at `path`.
///
/// # Errors
/// Returns `ConfigError` if the file exists but cannot be read, parsed, or
/// validated.
pub fn load_config_from(path: &Path) -> Result<BabelConfig, ConfigError> {
    let config = match std::fs::read_to_string(path) {
        Ok(content) => BabelConfig::from_toml_str(&content)
            .map_err(|source| ConfigError::TomlParse { path: path.to_path_buf(), source })?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No configuration file, using defaults");
            BabelConfig::default()
        }
        Err(source) => return Err(ConfigError::Io { path: path.to_path_buf(), source }),
    };

    config.validate()?;
    Ok(config)
}
