//! Process-local, short-lived translation cache.

use babel_abstraction::InferenceResult;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::key::CacheKey;

#[derive(Debug, Clone)]
struct MemoryEntry {
    result: InferenceResult,
    inserted_at: Instant,
}

impl MemoryEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() >= ttl
    }
}

/// In-memory first tier of the translation cache.
///
/// Absorbs bursts of identical requests within one process. Entries expire
/// `ttl` after insertion; expiry is checked on read, there is no background
/// sweep. Capacity is unbounded and everything is lost on restart.
#[derive(Debug)]
pub struct TierOneCache {
    entries: RwLock<HashMap<CacheKey, MemoryEntry>>,
    ttl: Duration,
}

impl TierOneCache {
    /// Creates an empty cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { entries: RwLock::new(HashMap::new()), ttl }
    }

    /// Returns the cached result for `key` if it is still fresh.
    ///
    /// An expired entry found here is removed.
    pub fn get(&self, key: &CacheKey) -> Option<InferenceResult> {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(self.ttl) => return Some(entry.result.clone()),
                Some(_) => {}
            }
        }

        // Re-check under the write lock: a concurrent put may have refreshed it.
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.get(key).is_some_and(|entry| entry.is_expired(self.ttl)) {
            entries.remove(key);
            debug!(key = %key, "Tier one entry expired");
        }
        None
    }

    /// Stores `result` under `key`, replacing any previous entry and
    /// restarting its TTL.
    pub fn put(&self, key: CacheKey, result: InferenceResult) {
        let entry = MemoryEntry { result, inserted_at: Instant::now() };
        self.entries.write().unwrap_or_else(PoisonError::into_inner).insert(key, entry);
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(self.ttl));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// The configured TTL.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }
}
