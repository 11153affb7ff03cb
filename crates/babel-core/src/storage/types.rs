//! Durable cache entry type.

use babel_abstraction::InferenceResult;
use babel_models::CacheKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A translation persisted in the durable tier.
///
/// `created_at` never changes after the entry is written; the TTL is
/// absolute from it. `last_accessed_at` and `access_count` advance on every
/// cache hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Lookup key the entry is stored under.
    pub key: CacheKey,
    /// The text that was translated.
    pub source_input: String,
    /// The language it was translated into.
    pub target_variant: String,
    /// The provider's result.
    pub result: InferenceResult,
    /// When the entry was first written.
    pub created_at: DateTime<Utc>,
    /// When the entry was last served.
    pub last_accessed_at: DateTime<Utc>,
    /// How many times the entry has been served from the cache.
    pub access_count: u64,
}

impl CacheEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn new(
        key: CacheKey,
        source_input: String,
        target_variant: String,
        result: InferenceResult,
    ) -> Self {
        Self::new_at(key, source_input, target_variant, result, Utc::now())
    }

    /// Creates an entry with an explicit creation time.
    #[must_use]
    pub fn new_at(
        key: CacheKey,
        source_input: String,
        target_variant: String,
        result: InferenceResult,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            source_input,
            target_variant,
            result,
            created_at,
            last_accessed_at: created_at,
            access_count: 0,
        }
    }

    /// Records a read at `at`. Never moves `last_accessed_at` backwards.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        if at > self.last_accessed_at {
            self.last_accessed_at = at;
        }
        self.access_count += 1;
    }

    /// Whether more than `ttl` has passed between creation and `now`.
    #[must_use]
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let age_ms = now.timestamp_millis().saturating_sub(self.created_at.timestamp_millis());
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        age_ms > ttl_ms
    }
}
