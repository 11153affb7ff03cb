//! Cache-first resolution of a single translation.
//!
//! The orchestrator consults the process-local tier, then the durable tier,
//! and only then the provider (through the retry policy). Successful results
//! are written to both tiers; failures are never cached.

use babel_abstraction::{InferenceClient, InferenceError, InferenceRequest, InferenceResult};
use babel_models::{CacheConfig, CacheKey, CacheKeyCodec, TierOneCache};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::retry::{RetryError, RetryPolicy};
use crate::storage::{CacheEntry, StorageResult, TierTwoCache};

/// Where a translated result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServedFrom {
    /// The process-local cache.
    TierOne,
    /// The durable, shared cache.
    TierTwo,
    /// A fresh provider call.
    Provider,
}

impl ServedFrom {
    /// Whether the result was served without calling the provider.
    #[must_use]
    pub const fn is_cache(self) -> bool {
        matches!(self, Self::TierOne | Self::TierTwo)
    }
}

/// Outcome of resolving one `(input, source, target)` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Source and target variants are identical; nothing was translated.
    SkippedIdentical,
    /// A translation, with its provenance.
    Translated {
        /// The provider result, possibly replayed from a cache tier.
        result: InferenceResult,
        /// Which layer produced it.
        served_from: ServedFrom,
    },
}

impl Resolution {
    /// Flattens the resolution into a caller-facing translation.
    ///
    /// A skipped resolution echoes `input` back.
    #[must_use]
    pub fn into_translation(self, input: &str) -> Translation {
        match self {
            Self::SkippedIdentical => {
                Translation { output: input.to_string(), served_from_cache: false }
            }
            Self::Translated { result, served_from } => {
                Translation { output: result.output, served_from_cache: served_from.is_cache() }
            }
        }
    }
}

/// A translated text as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    /// The translated text.
    pub output: String,
    /// Whether either cache tier served it.
    pub served_from_cache: bool,
}

/// Snapshot of the orchestrator's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups answered by tier one.
    pub tier_one_hits: u64,
    /// Lookups answered by tier two.
    pub tier_two_hits: u64,
    /// Lookups that had to go to the provider.
    pub misses: u64,
    /// Provider invocations, retries included.
    pub provider_calls: u64,
    /// Tier-two writes that failed and were dropped.
    pub write_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    tier_one_hits: AtomicU64,
    tier_two_hits: AtomicU64,
    misses: AtomicU64,
    provider_calls: AtomicU64,
    write_failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            tier_one_hits: self.tier_one_hits.load(Ordering::Relaxed),
            tier_two_hits: self.tier_two_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            provider_calls: self.provider_calls.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }
}

/// Two-tier cache in front of an inference client.
///
/// No coordination happens between concurrent misses on the same key: both
/// may call the provider, and the later durable write wins.
pub struct CacheOrchestrator {
    client: Arc<dyn InferenceClient>,
    codec: CacheKeyCodec,
    tier_one: TierOneCache,
    tier_two: Arc<TierTwoCache>,
    retry: RetryPolicy,
    writes: TaskTracker,
    counters: Arc<Counters>,
}

impl CacheOrchestrator {
    /// Creates an orchestrator. The tier-one TTL and key policy come from
    /// `config`; `tier_two` carries its own TTL.
    pub fn new(
        client: Arc<dyn InferenceClient>,
        tier_two: Arc<TierTwoCache>,
        config: &CacheConfig,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            codec: CacheKeyCodec::new(config.schema_version, config.key_policy()),
            tier_one: TierOneCache::new(config.tier_one_ttl()),
            tier_two,
            retry,
            writes: TaskTracker::new(),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Resolves `input` into `target_variant`, consulting the caches first.
    ///
    /// # Errors
    /// Returns the provider's final failure with the number of attempts made.
    /// Whitespace-only input fails with `MalformedInput` after zero attempts.
    pub async fn resolve(
        &self,
        input: &str,
        source_variant: Option<&str>,
        target_variant: &str,
    ) -> Result<Resolution, RetryError> {
        let mut request = InferenceRequest::new(input, target_variant);
        if let Some(source) = source_variant {
            request = request.with_source(source);
        }

        if request.is_identity() {
            debug!(variant = target_variant, "Source and target identical, skipping");
            return Ok(Resolution::SkippedIdentical);
        }

        if input.trim().is_empty() {
            return Err(RetryError::before_attempt(InferenceError::MalformedInput(
                "input is empty".to_string(),
            )));
        }

        let key = self.codec.derive(input, target_variant);

        if let Some(result) = self.tier_one.get(&key) {
            debug!(key = %key, "Tier one hit");
            Counters::bump(&self.counters.tier_one_hits);
            return Ok(Resolution::Translated { result, served_from: ServedFrom::TierOne });
        }

        if let Some(entry) = self.read_tier_two(&key) {
            debug!(key = %key, access_count = entry.access_count, "Tier two hit");
            Counters::bump(&self.counters.tier_two_hits);
            self.tier_one.put(key, entry.result.clone());
            return Ok(Resolution::Translated {
                result: entry.result,
                served_from: ServedFrom::TierTwo,
            });
        }

        debug!(key = %key, target = target_variant, "Cache miss");
        Counters::bump(&self.counters.misses);

        let request = &request;
        let result = self
            .retry
            .execute(|| {
                Counters::bump(&self.counters.provider_calls);
                self.client.invoke(request)
            })
            .await?;

        self.tier_one.put(key.clone(), result.clone());
        self.write_tier_two(CacheEntry::new(
            key,
            input.to_string(),
            target_variant.to_string(),
            result.clone(),
        ));

        Ok(Resolution::Translated { result, served_from: ServedFrom::Provider })
    }

    /// Waits until every pending durable write has finished.
    pub async fn flush(&self) {
        self.writes.close();
        self.writes.wait().await;
        self.writes.reopen();
    }

    /// Current counter values.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Deletes expired durable entries, returning how many were removed.
    ///
    /// # Errors
    /// Returns `StorageError` if the durable store cannot be written.
    pub fn sweep_expired(&self) -> StorageResult<usize> {
        self.tier_two.sweep_expired()
    }

    /// The process-local tier.
    #[must_use]
    pub const fn tier_one(&self) -> &TierOneCache {
        &self.tier_one
    }

    /// The durable tier.
    #[must_use]
    pub fn tier_two(&self) -> &TierTwoCache {
        &self.tier_two
    }

    /// The key codec requests are hashed with.
    #[must_use]
    pub const fn codec(&self) -> &CacheKeyCodec {
        &self.codec
    }

    /// The provider behind the caches.
    #[must_use]
    pub fn provider_id(&self) -> &str {
        self.client.provider_id()
    }

    /// An unavailable durable tier degrades to a miss.
    fn read_tier_two(&self, key: &CacheKey) -> Option<CacheEntry> {
        match self.tier_two.get(key) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %key, error = %e, "Tier two read failed, treating as miss");
                None
            }
        }
    }

    fn write_tier_two(&self, entry: CacheEntry) {
        let tier_two = Arc::clone(&self.tier_two);
        let counters = Arc::clone(&self.counters);
        self.writes.spawn_blocking(move || {
            if let Err(e) = tier_two.put(&entry) {
                warn!(key = %entry.key, error = %e, "Tier two write failed");
                Counters::bump(&counters.write_failures);
            }
        });
    }
}
