//! Shared test utilities for Babel Core integration tests.
//!
//! Stub inference clients with scripted failures and latency, and entry stores
//! that fail or count their reads.

#![allow(dead_code)]

use async_trait::async_trait;
use babel_abstraction::{
    InferenceClient, InferenceError, InferenceRequest, InferenceResult, ProviderMetadata,
};
use babel_core::{
    CacheEntry, CacheOrchestrator, EntryStore, RetryPolicy, SqliteEntryStore, StorageError,
    StorageResult, TierTwoCache,
};
use babel_models::{CacheConfig, CacheKey};
use chrono::{DateTime, Utc};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// The output every stub client produces for a successful call.
pub fn stub_output(request: &InferenceRequest) -> String {
    format!("{}:{}", request.target_variant, request.input.trim())
}

fn stub_result(request: &InferenceRequest) -> InferenceResult {
    InferenceResult {
        output: stub_output(request),
        provider_metadata: ProviderMetadata::default(),
        elapsed_ms: 1,
    }
}

/// Replays scripted failures, then succeeds.
#[derive(Default)]
pub struct ScriptedClient {
    failures: Mutex<VecDeque<InferenceError>>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    /// A client whose first calls fail with `failures`, in order.
    pub fn failing_with(failures: impl IntoIterator<Item = InferenceError>) -> Self {
        Self { failures: Mutex::new(failures.into_iter().collect()), calls: AtomicUsize::new(0) }
    }

    /// Total invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceClient for ScriptedClient {
    async fn invoke(&self, request: &InferenceRequest) -> Result<InferenceResult, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.failures.lock().unwrap().pop_front();
        match scripted {
            Some(error) => Err(error),
            None => Ok(stub_result(request)),
        }
    }

    fn provider_id(&self) -> &str {
        "scripted"
    }
}

/// Takes `latency` per call and records the peak number of concurrent calls.
pub struct SlowClient {
    latency: Duration,
    failing_targets: HashSet<String>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl SlowClient {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            failing_targets: HashSet::new(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Calls for these targets fail with `AuthFailure` after the latency.
    pub fn failing_for(mut self, targets: &[&str]) -> Self {
        self.failing_targets = targets.iter().map(ToString::to_string).collect();
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceClient for SlowClient {
    async fn invoke(&self, request: &InferenceRequest) -> Result<InferenceResult, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.latency).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing_targets.contains(&request.target_variant) {
            return Err(InferenceError::AuthFailure(format!(
                "no access to {}",
                request.target_variant
            )));
        }
        Ok(stub_result(request))
    }

    fn provider_id(&self) -> &str {
        "slow"
    }
}

/// A store whose every operation fails.
pub struct UnavailableStore;

impl UnavailableStore {
    fn down<T>() -> StorageResult<T> {
        Err(StorageError::Unavailable("store is down".to_string()))
    }
}

impl EntryStore for UnavailableStore {
    fn load(&self, _key: &CacheKey) -> StorageResult<Option<CacheEntry>> {
        Self::down()
    }

    fn save(&self, _entry: &CacheEntry) -> StorageResult<()> {
        Self::down()
    }

    fn delete_expired(&self, _key: &CacheKey, _cutoff: DateTime<Utc>) -> StorageResult<bool> {
        Self::down()
    }

    fn record_access(&self, _key: &CacheKey, _at: DateTime<Utc>) -> StorageResult<()> {
        Self::down()
    }

    fn delete_created_before(&self, _cutoff: DateTime<Utc>) -> StorageResult<usize> {
        Self::down()
    }

    fn count(&self) -> StorageResult<usize> {
        Self::down()
    }
}

/// An in-memory SQLite store that counts reads.
pub struct CountingStore {
    inner: SqliteEntryStore,
    loads: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self { inner: SqliteEntryStore::open_in_memory().unwrap(), loads: AtomicUsize::new(0) }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl EntryStore for CountingStore {
    fn load(&self, key: &CacheKey) -> StorageResult<Option<CacheEntry>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load(key)
    }

    fn save(&self, entry: &CacheEntry) -> StorageResult<()> {
        self.inner.save(entry)
    }

    fn delete_expired(&self, key: &CacheKey, cutoff: DateTime<Utc>) -> StorageResult<bool> {
        self.inner.delete_expired(key, cutoff)
    }

    fn record_access(&self, key: &CacheKey, at: DateTime<Utc>) -> StorageResult<()> {
        self.inner.record_access(key, at)
    }

    fn delete_created_before(&self, cutoff: DateTime<Utc>) -> StorageResult<usize> {
        self.inner.delete_created_before(cutoff)
    }

    fn count(&self) -> StorageResult<usize> {
        self.inner.count()
    }
}

/// Retry policy with short, exact back-off for timing assertions.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(100))
}

/// Builds an orchestrator over `client` and `store` with default cache settings.
pub fn orchestrator(
    client: Arc<dyn InferenceClient>,
    store: Arc<dyn EntryStore>,
    retry: RetryPolicy,
) -> CacheOrchestrator {
    orchestrator_with(client, store, retry, &CacheConfig::default())
}

pub fn orchestrator_with(
    client: Arc<dyn InferenceClient>,
    store: Arc<dyn EntryStore>,
    retry: RetryPolicy,
    config: &CacheConfig,
) -> CacheOrchestrator {
    let tier_two = Arc::new(TierTwoCache::new(store, config.tier_two_ttl()));
    CacheOrchestrator::new(client, tier_two, config, retry)
}
