//! Durable second tier of the translation cache.

use babel_models::CacheKey;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::storage::entry_store::EntryStore;
use crate::storage::error::StorageResult;
use crate::storage::types::CacheEntry;

/// Long-lived cache tier shared by every process using the same store.
///
/// The TTL is absolute from an entry's creation. Expiry is enforced on read,
/// so a stale entry is never returned even if [`TierTwoCache::sweep_expired`]
/// has never run. Writes are last-write-wins: a second `put` for a key
/// replaces the whole entry, `created_at` included.
pub struct TierTwoCache {
    store: Arc<dyn EntryStore>,
    ttl: Duration,
}

impl TierTwoCache {
    /// Creates the tier over `store` with entries living `ttl` after creation.
    pub fn new(store: Arc<dyn EntryStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Returns the live entry for `key`, recording the access.
    ///
    /// An expired entry is deleted and reported as a miss. The delete is
    /// conditional on the entry still being expired, so a fresh entry written
    /// concurrently by another process is kept.
    ///
    /// # Errors
    /// Returns `StorageError` if the store cannot be read or the expired
    /// entry cannot be deleted.
    pub fn get(&self, key: &CacheKey) -> StorageResult<Option<CacheEntry>> {
        let now = Utc::now();
        let Some(mut entry) = self.store.load(key)? else {
            return Ok(None);
        };

        if entry.is_expired(self.ttl, now) {
            self.store.delete_expired(key, self.cutoff(now))?;
            debug!(key = %key, created_at = %entry.created_at, "Tier two entry expired");
            return Ok(None);
        }

        if let Err(e) = self.store.record_access(key, now) {
            warn!(key = %key, error = %e, "Failed to record cache access");
        }
        entry.touch(now);
        Ok(Some(entry))
    }

    /// Stores `entry` under its key, replacing any existing entry.
    ///
    /// # Errors
    /// Returns `StorageError` if the store cannot be written.
    pub fn put(&self, entry: &CacheEntry) -> StorageResult<()> {
        self.store.save(entry)
    }

    /// Deletes every expired entry and returns how many were removed.
    ///
    /// # Errors
    /// Returns `StorageError` if the store cannot be written.
    pub fn sweep_expired(&self) -> StorageResult<usize> {
        let removed = self.store.delete_created_before(self.cutoff(Utc::now()))?;
        info!(removed, ttl_secs = self.ttl.as_secs(), "Swept expired cache entries");
        Ok(removed)
    }

    /// Number of stored entries, expired ones included.
    ///
    /// # Errors
    /// Returns `StorageError` if the store cannot be read.
    pub fn len(&self) -> StorageResult<usize> {
        self.store.count()
    }

    /// The configured TTL.
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Entries created before this instant are expired at `now`.
    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        DateTime::from_timestamp_millis(now.timestamp_millis().saturating_sub(ttl_ms))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteEntryStore;
    use babel_abstraction::{InferenceResult, ProviderMetadata};
    use babel_models::KeyPolicy;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn cache() -> TierTwoCache {
        TierTwoCache::new(Arc::new(SqliteEntryStore::open_in_memory().unwrap()), 30 * DAY)
    }

    fn entry(text: &str, age: chrono::Duration) -> CacheEntry {
        CacheEntry::new_at(
            CacheKey::derive(text, "ja", 1, KeyPolicy::FullInput),
            text.to_string(),
            "ja".to_string(),
            InferenceResult {
                output: format!("{text}-ja"),
                provider_metadata: ProviderMetadata::default(),
                elapsed_ms: 1,
            },
            Utc::now() - age,
        )
    }

    #[test]
    fn test_hit_records_access_without_refreshing_creation() {
        let cache = cache();
        let stored = entry("hello", chrono::Duration::days(2));
        cache.put(&stored).unwrap();

        let first = cache.get(&stored.key).unwrap().unwrap();
        assert_eq!(first.access_count, 1);
        let second = cache.get(&stored.key).unwrap().unwrap();
        assert_eq!(second.access_count, 2);
        assert!(second.last_accessed_at >= first.last_accessed_at);
        assert_eq!(second.created_at.timestamp_millis(), stored.created_at.timestamp_millis());
    }

    #[test]
    fn test_expired_entry_is_miss_and_deleted_without_sweep() {
        let cache = cache();
        let stale = entry("stale", chrono::Duration::days(31));
        cache.put(&stale).unwrap();
        assert_eq!(cache.len().unwrap(), 1);

        assert!(cache.get(&stale.key).unwrap().is_none());
        assert_eq!(cache.len().unwrap(), 0);
    }

    /// Saves a fresh entry right after every load, as a concurrent writer
    /// in another process would.
    struct RewritingStore {
        inner: SqliteEntryStore,
        fresh: CacheEntry,
    }

    impl EntryStore for RewritingStore {
        fn load(&self, key: &CacheKey) -> StorageResult<Option<CacheEntry>> {
            let loaded = self.inner.load(key)?;
            self.inner.save(&self.fresh)?;
            Ok(loaded)
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

    #[test]
    fn test_lazy_expiry_keeps_concurrent_fresh_write() {
        let stale = entry("hello", chrono::Duration::days(40));
        let mut fresh = entry("hello", chrono::Duration::zero());
        fresh.result.output = "fresh".to_string();

        let inner = SqliteEntryStore::open_in_memory().unwrap();
        inner.save(&stale).unwrap();
        let store = Arc::new(RewritingStore { inner, fresh });
        let cache = TierTwoCache::new(store.clone(), 30 * DAY);

        assert!(cache.get(&stale.key).unwrap().is_none());

        let kept = store.inner.load(&stale.key).unwrap().unwrap();
        assert_eq!(kept.result.output, "fresh");
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let cache = cache();
        cache.put(&entry("a", chrono::Duration::days(45))).unwrap();
        cache.put(&entry("b", chrono::Duration::days(31))).unwrap();
        cache.put(&entry("c", chrono::Duration::days(29))).unwrap();

        assert_eq!(cache.sweep_expired().unwrap(), 2);
        assert_eq!(cache.len().unwrap(), 1);
        assert_eq!(cache.sweep_expired().unwrap(), 0);
    }

    #[test]
    fn test_put_twice_is_last_write_wins() {
        let cache = cache();
        let older = entry("hello", chrono::Duration::days(10));
        let mut newer = entry("hello", chrono::Duration::zero());
        newer.result.output = "newer".to_string();

        cache.put(&older).unwrap();
        cache.put(&newer).unwrap();

        let hit = cache.get(&older.key).unwrap().unwrap();
        assert_eq!(hit.result.output, "newer");
        assert_eq!(hit.created_at.timestamp_millis(), newer.created_at.timestamp_millis());
        assert_eq!(cache.len().unwrap(), 1);
    }
}
