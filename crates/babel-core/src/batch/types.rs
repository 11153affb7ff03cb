//! Data types for batch dispatch.

use babel_abstraction::ErrorKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::batch::error::BatchSettingsError;
use crate::orchestrator::Translation;
use crate::retry::RetryError;

/// One input to be translated into a set of target variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    /// The text to translate.
    pub input: String,
    /// Language of `input`; `None` lets the provider detect it.
    pub source_variant: Option<String>,
    /// Distinct target variants.
    pub target_variants: BTreeSet<String>,
    /// Maximum number of variants resolved at the same time.
    pub concurrency_limit: usize,
}

impl BatchJob {
    /// Creates a job; duplicate variants collapse into one.
    pub fn new<I, S>(input: impl Into<String>, target_variants: I, concurrency_limit: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: input.into(),
            source_variant: None,
            target_variants: target_variants.into_iter().map(Into::into).collect(),
            concurrency_limit,
        }
    }

    /// Sets an explicit source variant.
    #[must_use]
    pub fn with_source(mut self, source_variant: impl Into<String>) -> Self {
        self.source_variant = Some(source_variant.into());
        self
    }
}

/// A variant that failed, as reported to batch callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Taxonomy tag of the final failure.
    pub kind: ErrorKind,
    /// Human-readable failure detail.
    pub message: String,
    /// Provider attempts made before giving up.
    pub attempts: u32,
}

impl From<&RetryError> for ErrorRecord {
    fn from(err: &RetryError) -> Self {
        Self { kind: err.error.kind(), message: err.error.to_string(), attempts: err.attempts }
    }
}

impl From<RetryError> for ErrorRecord {
    fn from(err: RetryError) -> Self {
        Self::from(&err)
    }
}

/// Result of one variant within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariantOutcome {
    /// The variant was translated (or skipped as identical to the source).
    Translated(Translation),
    /// The variant failed; siblings are unaffected.
    Failed(ErrorRecord),
}

impl VariantOutcome {
    /// Whether the variant produced a translation.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Translated(_))
    }
}

/// Result of a batch run: one outcome per distinct target variant.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Outcome per variant.
    pub outcomes: BTreeMap<String, VariantOutcome>,
    /// Wall-clock time of the whole batch.
    #[serde(skip)]
    pub total_duration: Duration,
    /// Number of translated variants.
    pub successful: usize,
    /// Number of failed variants.
    pub failed: usize,
    /// Success rate as a percentage (0.0 to 100.0).
    pub success_rate: f64,
}

impl BatchReport {
    /// Create a new batch report.
    pub fn new(outcomes: BTreeMap<String, VariantOutcome>, total_duration: Duration) -> Self {
        let successful = outcomes.values().filter(|outcome| outcome.is_success()).count();
        let failed = outcomes.len() - successful;
        #[allow(clippy::cast_precision_loss)]
        let success_rate = if outcomes.is_empty() {
            0.0
        } else {
            (successful as f64 / outcomes.len() as f64) * 100.0
        };

        Self { outcomes, total_duration, successful, failed, success_rate }
    }

    /// Get total number of variants resolved.
    pub fn total_variants(&self) -> usize {
        self.outcomes.len()
    }

    /// Check if every variant was translated.
    pub const fn is_complete_success(&self) -> bool {
        self.failed == 0
    }

    /// Outcome for `variant`, if it was part of the batch.
    pub fn get(&self, variant: &str) -> Option<&VariantOutcome> {
        self.outcomes.get(variant)
    }
}

/// Batch settings, the `[batch]` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSettings {
    /// Default number of variants resolved concurrently (default: 4).
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,
}

fn default_concurrency_limit() -> usize {
    4
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self { concurrency_limit: default_concurrency_limit() }
    }
}

impl BatchSettings {
    /// Validate the batch settings.
    ///
    /// # Errors
    /// Returns `BatchSettingsError` for the first invalid value.
    pub const fn validate(&self) -> Result<(), BatchSettingsError> {
        if self.concurrency_limit == 0 {
            return Err(BatchSettingsError::InvalidConcurrencyLimit);
        }
        Ok(())
    }
}
