//! Error types for Babel Core.

use babel_abstraction::InferenceError;
use thiserror::Error;

use crate::batch::BatchError;
use crate::config::ConfigError;
use crate::retry::RetryError;
use crate::storage::StorageError;

/// Core error type for Babel operations.
#[derive(Error, Debug)]
pub enum BabelError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Provider client construction errors
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    /// A translation that failed after retrying
    #[error("Translation failed: {0}")]
    Translation(#[from] RetryError),

    /// A batch that was rejected as a whole
    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),
}

/// Result type alias for Babel operations.
pub type Result<T> = std::result::Result<T, BabelError>;
