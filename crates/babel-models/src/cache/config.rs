//! Configuration for the translation cache tiers.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::key::KeyPolicy;

/// Configuration for both cache tiers and the key codec.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    /// Version tag mixed into every cache key (default: 1).
    ///
    /// Bump it whenever the way requests are built changes; old entries then
    /// stop matching without a bulk delete.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Seconds an in-process entry stays valid (default: 300 = 5 minutes).
    #[serde(default = "default_tier_one_ttl_secs")]
    pub tier_one_ttl_secs: u64,

    /// Seconds a durable entry stays valid after creation (default: 2592000 = 30 days).
    #[serde(default = "default_tier_two_ttl_secs")]
    pub tier_two_ttl_secs: u64,

    /// Hash only this many leading characters of the input (default: whole input).
    ///
    /// Inputs sharing the prefix collide on purpose when this is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_prefix_chars: Option<usize>,

    /// Path of the durable store, relative to the workspace root (default: `.babel/cache.db`).
    #[serde(default = "default_database")]
    pub database: String,
}

fn default_schema_version() -> u32 {
    1
}

fn default_tier_one_ttl_secs() -> u64 {
    300 // 5 minutes
}

fn default_tier_two_ttl_secs() -> u64 {
    30 * 24 * 60 * 60 // 30 days
}

fn default_database() -> String {
    ".babel/cache.db".to_string()
}

/// Errors that can occur during cache configuration validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheConfigError {
    /// Invalid tier one TTL (must be > 0).
    #[error("Invalid tier one TTL: must be greater than 0")]
    InvalidTierOneTtl,

    /// Invalid tier two TTL (must be > 0).
    #[error("Invalid tier two TTL: must be greater than 0")]
    InvalidTierTwoTtl,

    /// Invalid key prefix length (must be > 0 when set).
    #[error("Invalid key prefix length: must be greater than 0")]
    InvalidKeyPrefix,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            tier_one_ttl_secs: default_tier_one_ttl_secs(),
            tier_two_ttl_secs: default_tier_two_ttl_secs(),
            key_prefix_chars: None,
            database: default_database(),
        }
    }
}

impl CacheConfig {
    /// Validate the cache configuration.
    ///
    /// # Errors
    /// Returns `CacheConfigError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), CacheConfigError> {
        if self.tier_one_ttl_secs == 0 {
            return Err(CacheConfigError::InvalidTierOneTtl);
        }

        if self.tier_two_ttl_secs == 0 {
            return Err(CacheConfigError::InvalidTierTwoTtl);
        }

        if self.key_prefix_chars == Some(0) {
            return Err(CacheConfigError::InvalidKeyPrefix);
        }

        Ok(())
    }

    /// Get the tier one TTL as a Duration.
    #[must_use]
    pub fn tier_one_ttl(&self) -> Duration {
        Duration::from_secs(self.tier_one_ttl_secs)
    }

    /// Get the tier two TTL as a Duration.
    #[must_use]
    pub fn tier_two_ttl(&self) -> Duration {
        Duration::from_secs(self.tier_two_ttl_secs)
    }

    /// The key derivation policy implied by `key_prefix_chars`.
    #[must_use]
    pub fn key_policy(&self) -> KeyPolicy {
        self.key_prefix_chars.map_or(KeyPolicy::FullInput, KeyPolicy::Prefix)
    }
}
