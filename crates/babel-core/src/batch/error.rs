//! Error types for batch dispatch.

use thiserror::Error;

/// Errors that reject a batch as a whole.
///
/// Failures of individual variants never surface here; they are recorded in
/// the batch report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// The job or dispatcher was configured with unusable values.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors that can occur during batch settings validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchSettingsError {
    /// A zero limit would never start a worker.
    #[error("concurrency_limit must be greater than 0")]
    InvalidConcurrencyLimit,
}
