//! Failure classification and bounded exponential backoff.
//!
//! [`RetryPolicy`] is the only place where back-off timing is decided. Provider
//! clients never retry on their own, and the cache layers never wait.

use babel_abstraction::InferenceError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// The final failure of a retried operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error} (after {attempts} attempt(s))")]
pub struct RetryError {
    /// The last classified failure.
    pub error: InferenceError,
    /// Attempts made, including the failed last one.
    pub attempts: u32,
}

impl RetryError {
    /// A failure that was decided before any attempt was made.
    #[must_use]
    pub const fn before_attempt(error: InferenceError) -> Self {
        Self { error, attempts: 0 }
    }
}

/// Errors that can occur during retry settings validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RetrySettingsError {
    /// No attempt would ever be made.
    #[error("max_attempts must be greater than 0")]
    InvalidMaxAttempts,

    /// The back-off cap is below the first delay.
    #[error("max_delay_ms must not be smaller than base_delay_ms")]
    InvalidMaxDelay,

    /// A zero per-attempt timeout would fail every call.
    #[error("attempt_timeout_secs must be greater than 0")]
    InvalidAttemptTimeout,
}

/// Retry settings, the `[retry]` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts per request, the first one included (default: 3).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Back-off before the first retry; doubles after each attempt (default: 500 ms).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for a single back-off sleep (default: 30 s).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Deadline for one attempt; exceeding it counts as a network failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_timeout_secs: Option<u64>,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            attempt_timeout_secs: None,
        }
    }
}

impl RetrySettings {
    /// Validate the retry settings.
    ///
    /// # Errors
    /// Returns `RetrySettingsError` for the first invalid value.
    pub fn validate(&self) -> Result<(), RetrySettingsError> {
        if self.max_attempts == 0 {
            return Err(RetrySettingsError::InvalidMaxAttempts);
        }

        if self.max_delay_ms < self.base_delay_ms {
            return Err(RetrySettingsError::InvalidMaxDelay);
        }

        if self.attempt_timeout_secs == Some(0) {
            return Err(RetrySettingsError::InvalidAttemptTimeout);
        }

        Ok(())
    }
}

/// Bounded exponential-backoff retry for inference calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

impl RetryPolicy {
    /// Creates a policy making at most `max_attempts` attempts (at least one).
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: Duration::from_millis(default_max_delay_ms()).max(base_delay),
            attempt_timeout: None,
        }
    }

    /// Builds a policy from configuration.
    #[must_use]
    pub fn from_settings(settings: &RetrySettings) -> Self {
        let mut policy = Self::new(settings.max_attempts, Duration::from_millis(settings.base_delay_ms))
            .with_max_delay(Duration::from_millis(settings.max_delay_ms));
        if let Some(secs) = settings.attempt_timeout_secs {
            policy = policy.with_attempt_timeout(Duration::from_secs(secs));
        }
        policy
    }

    /// Caps a single back-off sleep.
    #[must_use]
    pub const fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Bounds each attempt; a timed-out attempt is a `NetworkFailure`.
    #[must_use]
    pub const fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Maximum number of attempts.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Back-off after the attempt with zero-based index `attempt_index`:
    /// `base_delay * 2^attempt_index`, capped at `max_delay`.
    #[must_use]
    pub fn backoff_delay(&self, attempt_index: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt_index).unwrap_or(u32::MAX);
        self.base_delay.checked_mul(factor).unwrap_or(Duration::MAX).min(self.max_delay)
    }

    /// Sleep before retrying after `error` on attempt `attempt_index`.
    ///
    /// A provider-supplied `retry_after` raises the sleep but never past
    /// `max_delay`.
    fn delay_for(&self, attempt_index: u32, error: &InferenceError) -> Duration {
        let backoff = self.backoff_delay(attempt_index);
        error.retry_after().map_or(backoff, |hint| backoff.max(hint.min(self.max_delay)))
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or runs out of attempts.
    ///
    /// # Errors
    /// Returns the last failure together with the number of attempts made.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, InferenceError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let outcome = match self.attempt_timeout {
                Some(timeout) => tokio::time::timeout(timeout, operation()).await.unwrap_or_else(
                    |_| {
                        Err(InferenceError::NetworkFailure(format!(
                            "attempt timed out after {}ms",
                            timeout.as_millis()
                        )))
                    },
                ),
                None => operation().await,
            };

            let error = match outcome {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !error.is_retryable() {
                debug!(attempt, error = %error, "Non-retryable failure");
                return Err(RetryError { error, attempts: attempt });
            }

            if attempt >= self.max_attempts {
                warn!(attempts = attempt, error = %error, "Retry attempts exhausted");
                return Err(RetryError { error, attempts: attempt });
            }

            let delay = self.delay_for(attempt - 1, &error);
            debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying after backoff"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
