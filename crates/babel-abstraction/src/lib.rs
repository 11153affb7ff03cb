//! Inference abstraction layer for Babel.
//!
//! This module defines the request/response types exchanged with an external
//! inference provider, the failure taxonomy every provider adapter maps into,
//! and the `InferenceClient` trait the cache and dispatch layers are written
//! against.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Represents a failure of a single call to an inference provider.
///
/// Provider adapters translate transport and HTTP failures into one of these
/// variants. Whether a failure is worth retrying is decided from the variant
/// alone, see [`InferenceError::is_retryable`].
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InferenceError {
    /// The provider throttled the caller.
    #[error("Rate limited{}", .retry_after.map(|d| format!(" (retry after {}s)", d.as_secs())).unwrap_or_default())]
    RateLimited {
        /// Provider-suggested wait before the next attempt, if it sent one.
        retry_after: Option<Duration>,
    },

    /// Credentials were missing, invalid, or lacked permission.
    #[error("Authentication failure: {0}")]
    AuthFailure(String),

    /// The provider is temporarily unable to serve requests (5xx, overload).
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The request never completed: connection error or deadline exceeded.
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// The provider rejected the request itself; resending it cannot succeed.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Anything the adapter could not classify.
    #[error("Unknown inference error: {0}")]
    Unknown(String),
}

impl InferenceError {
    /// Whether a later attempt of the same request may succeed.
    ///
    /// Only throttling, provider unavailability and network failures are
    /// transient. Authentication and input failures are final, and so is
    /// anything unclassified.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::ServiceUnavailable(_) | Self::NetworkFailure(_)
        )
    }

    /// The provider's requested back-off, for `RateLimited` failures.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// The taxonomy tag of this failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::AuthFailure(_) => ErrorKind::AuthFailure,
            Self::ServiceUnavailable(_) => ErrorKind::ServiceUnavailable,
            Self::NetworkFailure(_) => ErrorKind::NetworkFailure,
            Self::MalformedInput(_) => ErrorKind::MalformedInput,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }
}

/// Payload-free tag of an [`InferenceError`], used in serialized error records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`InferenceError::RateLimited`].
    RateLimited,
    /// See [`InferenceError::AuthFailure`].
    AuthFailure,
    /// See [`InferenceError::ServiceUnavailable`].
    ServiceUnavailable,
    /// See [`InferenceError::NetworkFailure`].
    NetworkFailure,
    /// See [`InferenceError::MalformedInput`].
    MalformedInput,
    /// See [`InferenceError::Unknown`].
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RateLimited => "rate_limited",
            Self::AuthFailure => "auth_failure",
            Self::ServiceUnavailable => "service_unavailable",
            Self::NetworkFailure => "network_failure",
            Self::MalformedInput => "malformed_input",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A single logical inference call: translate `input` into `target_variant`.
///
/// A request is built by the call that issues it and is never shared between
/// concurrent operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceRequest {
    /// The text to translate.
    pub input: String,
    /// Language of `input`; `None` lets the provider detect it.
    pub source_variant: Option<String>,
    /// Language to translate into.
    pub target_variant: String,
}

impl InferenceRequest {
    /// Creates a request with provider-side source detection.
    #[must_use]
    pub fn new(input: impl Into<String>, target_variant: impl Into<String>) -> Self {
        Self { input: input.into(), source_variant: None, target_variant: target_variant.into() }
    }

    /// Sets an explicit source variant.
    #[must_use]
    pub fn with_source(mut self, source_variant: impl Into<String>) -> Self {
        self.source_variant = Some(source_variant.into());
        self
    }

    /// Whether source and target are the same variant, making the call a no-op.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.source_variant.as_deref().is_some_and(|source| source == self.target_variant)
    }
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the prompt.
    pub prompt_tokens: u32,
    /// Number of tokens in the completion.
    pub completion_tokens: u32,
    /// Total number of tokens used.
    pub total_tokens: u32,
}

/// Provider details attached to a result for observability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// The model that produced the output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    /// Source language detected by the provider, when it was not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_source: Option<String>,
    /// Token usage for the call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

/// The output of a successful inference call. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceResult {
    /// The translated text.
    pub output: String,
    /// Provider details.
    #[serde(default)]
    pub provider_metadata: ProviderMetadata,
    /// Wall-clock duration of the provider call.
    pub elapsed_ms: u64,
}

/// An adapter to an external inference provider.
///
/// Implementations issue exactly one provider call per `invoke`: they neither
/// retry nor cache. Both concerns belong to the layers above.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Performs one inference call.
    ///
    /// # Errors
    /// Returns the classified [`InferenceError`] when the call fails.
    async fn invoke(&self, request: &InferenceRequest) -> Result<InferenceResult, InferenceError>;

    /// Identifier of the provider/model behind this client, for logs.
    fn provider_id(&self) -> &str;
}
