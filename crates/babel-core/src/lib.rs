//! Babel core: the durable cache tier, retry policy, cache orchestration and
//! bounded batch dispatch.
//!
//! A translation is resolved by [`CacheOrchestrator`]: the process-local tier
//! is consulted first, then the durable tier, and only then the provider,
//! through [`RetryPolicy`]. Batches fan out through
//! [`ConcurrencyDispatcher`]. [`TranslationService`] wires everything
//! together from a [`BabelConfig`].

pub mod batch;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod retry;
pub mod service;
pub mod storage;

pub use batch::{
    BatchError, BatchJob, BatchReport, BatchSettings, BatchSettingsError, ConcurrencyDispatcher,
    ErrorRecord, VariantOutcome,
};
pub use config::{BabelConfig, ConfigError, default_config_path, load_config, load_config_from};
pub use error::{BabelError, Result};
pub use orchestrator::{CacheOrchestrator, CacheStats, Resolution, ServedFrom, Translation};
pub use retry::{RetryError, RetryPolicy, RetrySettings, RetrySettingsError};
pub use service::{BatchRequest, Caller, TranslateRequest, TranslateResponse, TranslationService};
pub use storage::{
    CacheEntry, Database, EntryStore, SqliteEntryStore, StorageError, StorageResult, TierTwoCache,
};
