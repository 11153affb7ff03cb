//! Inbound entry points: single translations and batches.
//!
//! The service wires the provider client, both cache tiers, the retry policy
//! and the dispatcher together from a [`BabelConfig`]. Callers arrive already
//! authenticated; their identity is only recorded in logs.

use babel_abstraction::InferenceClient;
use babel_models::ClientFactory;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::batch::{BatchError, BatchJob, BatchReport, BatchSettings, ConcurrencyDispatcher};
use crate::config::BabelConfig;
use crate::error::Result;
use crate::orchestrator::{CacheOrchestrator, CacheStats, Translation};
use crate::retry::{RetryError, RetryPolicy};
use crate::storage::{EntryStore, SqliteEntryStore, StorageResult, TierTwoCache};

/// Identity of whoever issued a request, as established upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Caller {
    /// No authenticated user.
    #[default]
    Anonymous,
    /// An authenticated user id.
    User(String),
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("anonymous"),
            Self::User(id) => write!(f, "user:{id}"),
        }
    }
}

/// A single translation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateRequest {
    /// The text to translate.
    pub input: String,
    /// Language of `input`; absent means the provider detects it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_variant: Option<String>,
    /// Language to translate into.
    pub target_variant: String,
}

/// Response to a [`TranslateRequest`].
pub type TranslateResponse = Translation;

/// One input translated into several variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    /// The text to translate.
    pub input: String,
    /// Language of `input`; absent means the provider detects it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_variant: Option<String>,
    /// Target variants; duplicates are ignored.
    pub target_variants: Vec<String>,
    /// Overrides the configured concurrency limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency_limit: Option<usize>,
}

/// Translation front door over the cache orchestrator and batch dispatcher.
pub struct TranslationService {
    orchestrator: Arc<CacheOrchestrator>,
    dispatcher: ConcurrencyDispatcher,
    batch: BatchSettings,
}

impl TranslationService {
    /// Builds every component from `config`, opening the durable store under
    /// `workspace_root`.
    ///
    /// # Errors
    /// Returns `BabelError` if the configuration is invalid, the provider
    /// client cannot be built (e.g. missing API key), or the store cannot be
    /// opened.
    pub fn from_config(config: &BabelConfig, workspace_root: &Path) -> Result<Self> {
        config.validate()?;
        let client = ClientFactory::create(&config.inference)?;
        let store = SqliteEntryStore::open(&config.database_path(workspace_root))?;
        Ok(Self::with_client(client, Arc::new(store), config))
    }

    /// Builds the service around an existing client and store.
    pub fn with_client(
        client: Arc<dyn InferenceClient>,
        store: Arc<dyn EntryStore>,
        config: &BabelConfig,
    ) -> Self {
        let tier_two = Arc::new(TierTwoCache::new(store, config.cache.tier_two_ttl()));
        let orchestrator = Arc::new(CacheOrchestrator::new(
            client,
            tier_two,
            &config.cache,
            RetryPolicy::from_settings(&config.retry),
        ));
        Self::new(orchestrator, config.batch.clone())
    }

    /// Create a new service over an orchestrator.
    pub fn new(orchestrator: Arc<CacheOrchestrator>, batch: BatchSettings) -> Self {
        let dispatcher = ConcurrencyDispatcher::new(Arc::clone(&orchestrator));
        Self { orchestrator, dispatcher, batch }
    }

    /// Translates one input.
    ///
    /// Identical source and target variants echo the input back.
    ///
    /// # Errors
    /// Returns the final provider failure with the number of attempts made.
    pub async fn translate(
        &self,
        caller: &Caller,
        request: TranslateRequest,
    ) -> std::result::Result<TranslateResponse, RetryError> {
        debug!(
            caller = %caller,
            target = %request.target_variant,
            source = request.source_variant.as_deref().unwrap_or("auto"),
            "Translate request"
        );

        let resolution = self
            .orchestrator
            .resolve(&request.input, request.source_variant.as_deref(), &request.target_variant)
            .await?;
        Ok(resolution.into_translation(&request.input))
    }

    /// Translates one input into every requested variant.
    ///
    /// # Errors
    /// Returns `BatchError::InvalidConfig` for a zero concurrency limit.
    /// Per-variant failures are reported inside the returned report.
    pub async fn translate_batch(
        &self,
        caller: &Caller,
        request: BatchRequest,
    ) -> std::result::Result<BatchReport, BatchError> {
        let limit = request.concurrency_limit.unwrap_or(self.batch.concurrency_limit);
        info!(caller = %caller, variants = request.target_variants.len(), limit, "Batch request");

        let mut job = BatchJob::new(request.input, request.target_variants, limit);
        job.source_variant = request.source_variant;
        self.dispatcher.run(job).await
    }

    /// Deletes expired durable entries.
    ///
    /// # Errors
    /// Returns `StorageError` if the durable store cannot be written.
    pub fn sweep_expired(&self) -> StorageResult<usize> {
        self.orchestrator.sweep_expired()
    }

    /// Number of stored durable entries, expired ones included.
    ///
    /// # Errors
    /// Returns `StorageError` if the durable store cannot be read.
    pub fn durable_entries(&self) -> StorageResult<usize> {
        self.orchestrator.tier_two().len()
    }

    /// Current cache counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.orchestrator.stats()
    }

    /// Waits for pending durable writes.
    pub async fn flush(&self) {
        self.orchestrator.flush().await;
    }

    /// The underlying orchestrator.
    #[must_use]
    pub const fn orchestrator(&self) -> &Arc<CacheOrchestrator> {
        &self.orchestrator
    }
}
