//! Bounded-concurrency fan-out of one input to many target variants.

pub mod dispatcher;
pub mod error;
pub mod types;

pub use dispatcher::ConcurrencyDispatcher;
pub use error::{BatchError, BatchSettingsError};
pub use types::{BatchJob, BatchReport, BatchSettings, ErrorRecord, VariantOutcome};
