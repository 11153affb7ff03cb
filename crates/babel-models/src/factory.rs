//! Client factory for creating inference clients from configuration.
//!
//! This module selects the provider adapter named in configuration and
//! resolves its API key, either inline or from an environment variable.

use crate::{MockTranslator, OpenAiTranslator};
use babel_abstraction::{InferenceClient, InferenceError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Provider type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    /// Offline deterministic translator for testing.
    Mock,
    /// OpenAI or any OpenAI-compatible server.
    OpenAI,
}

impl FromStr for ProviderType {
    type Err = InferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "openai" | "openai-compatible" => Ok(Self::OpenAI),
            other => Err(InferenceError::Unknown(format!("unsupported provider '{other}'"))),
        }
    }
}

/// Provider settings, the `[inference]` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Provider name ("openai" or "mock").
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Provider-assigned model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the provider API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Inline API key. Prefer `api_key_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Completion token budget per call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Deadline for a single provider call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    crate::openai::DEFAULT_BASE_URL.to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.3
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: default_base_url(),
            api_key: None,
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ClientConfig {
    /// Get the per-call deadline as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Factory for creating inference clients.
pub struct ClientFactory;

impl ClientFactory {
    /// Creates a client from the given configuration.
    ///
    /// # Errors
    /// Returns `InferenceError::AuthFailure` when the OpenAI provider has no
    /// API key, or `InferenceError::Unknown` for an unsupported provider.
    #[allow(clippy::disallowed_methods)] // env::var is needed for API key loading
    pub fn create(config: &ClientConfig) -> Result<Arc<dyn InferenceClient>, InferenceError> {
        let provider: ProviderType = config.provider.parse()?;
        debug!(provider = ?provider, model = %config.model, "Creating inference client");

        match provider {
            ProviderType::Mock => Ok(Arc::new(MockTranslator::new(config.model.clone()))),
            ProviderType::OpenAI => {
                let api_key = match &config.api_key {
                    Some(key) => key.clone(),
                    None => std::env::var(&config.api_key_env).map_err(|_| {
                        InferenceError::AuthFailure(format!(
                            "{} environment variable not set",
                            config.api_key_env
                        ))
                    })?,
                };

                let translator = OpenAiTranslator::with_api_key(config.model.clone(), api_key)
                    .with_base_url(config.base_url.clone())
                    .with_max_tokens(config.max_tokens)
                    .with_temperature(config.temperature)
                    .with_timeout(config.timeout());
                Ok(Arc::new(translator))
            }
        }
    }
}
