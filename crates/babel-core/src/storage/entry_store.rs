//! Key-addressed persistence for durable cache entries.

use babel_models::CacheKey;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use crate::storage::database::Database;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::CacheEntry;

/// A document store holding one record per cache key.
///
/// Implementations must tolerate concurrent writers; saving an existing key
/// replaces the whole record (last write wins). Expiry policy is not the
/// store's concern, see `TierTwoCache`.
pub trait EntryStore: Send + Sync {
    /// Loads the record stored under `key`.
    fn load(&self, key: &CacheKey) -> StorageResult<Option<CacheEntry>>;

    /// Inserts or fully replaces the record for `entry.key`.
    fn save(&self, entry: &CacheEntry) -> StorageResult<()>;

    /// Deletes the record under `key` only if it was created strictly before
    /// `cutoff`, returning whether one was removed. A record rewritten since
    /// it was read survives.
    fn delete_expired(&self, key: &CacheKey, cutoff: DateTime<Utc>) -> StorageResult<bool>;

    /// Bumps the access metadata of `key` to `at`.
    fn record_access(&self, key: &CacheKey, at: DateTime<Utc>) -> StorageResult<()>;

    /// Deletes every record created strictly before `cutoff`.
    fn delete_created_before(&self, cutoff: DateTime<Utc>) -> StorageResult<usize>;

    /// Number of stored records.
    fn count(&self) -> StorageResult<usize>;
}

/// SQLite implementation of the entry store.
pub struct SqliteEntryStore {
    conn: Mutex<Connection>,
}

impl SqliteEntryStore {
    /// Opens (or creates) the store at `path`.
    ///
    /// # Errors
    /// Returns `StorageError` if the database cannot be opened or initialized.
    pub fn open(path: &Path) -> StorageResult<Self> {
        Ok(Self::from_database(Database::open(path)?))
    }

    /// Opens a private in-memory store, for tests.
    ///
    /// # Errors
    /// Returns `StorageError` if the schema cannot be created.
    pub fn open_in_memory() -> StorageResult<Self> {
        Ok(Self::from_database(Database::open_in_memory()?))
    }

    /// Create from an initialized database.
    pub fn from_database(db: Database) -> Self {
        Self { conn: Mutex::new(db.into_connection()) }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> StorageResult<T>) -> StorageResult<T> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        f(&conn)
    }

    /// Helper to convert a row into its raw columns.
    fn row_to_raw(row: &Row) -> rusqlite::Result<RawEntry> {
        Ok(RawEntry {
            key: row.get(0)?,
            source_input: row.get(1)?,
            target_variant: row.get(2)?,
            result_json: row.get(3)?,
            created_at: row.get(4)?,
            last_accessed_at: row.get(5)?,
            access_count: row.get(6)?,
        })
    }
}

/// Columns of one `translation_cache` row.
struct RawEntry {
    key: String,
    source_input: String,
    target_variant: String,
    result_json: String,
    created_at: i64,
    last_accessed_at: i64,
    access_count: i64,
}

impl RawEntry {
    fn into_entry(self) -> StorageResult<CacheEntry> {
        Ok(CacheEntry {
            key: CacheKey::from_stored(self.key),
            source_input: self.source_input,
            target_variant: self.target_variant,
            result: serde_json::from_str(&self.result_json)?,
            created_at: millis_to_datetime(self.created_at, "created_at")?,
            last_accessed_at: millis_to_datetime(self.last_accessed_at, "last_accessed_at")?,
            access_count: u64::try_from(self.access_count).map_err(|_| {
                StorageError::InvalidData(format!("negative access_count {}", self.access_count))
            })?,
        })
    }
}

fn millis_to_datetime(millis: i64, column: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StorageError::InvalidData(format!("{column} out of range: {millis}")))
}

impl EntryStore for SqliteEntryStore {
    fn load(&self, key: &CacheKey) -> StorageResult<Option<CacheEntry>> {
        let raw = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    r#"
                    SELECT key, source_input, target_variant, result_json,
                           created_at, last_accessed_at, access_count
                    FROM translation_cache WHERE key = ?1
                    "#,
                    params![key.as_str()],
                    Self::row_to_raw,
                )
                .optional()?)
        })?;

        raw.map(RawEntry::into_entry).transpose()
    }

    fn save(&self, entry: &CacheEntry) -> StorageResult<()> {
        let result_json = serde_json::to_string(&entry.result)?;
        let access_count = i64::try_from(entry.access_count).unwrap_or(i64::MAX);

        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO translation_cache (
                    key, source_input, target_variant, result_json,
                    created_at, last_accessed_at, access_count
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(key) DO UPDATE SET
                    source_input = excluded.source_input,
                    target_variant = excluded.target_variant,
                    result_json = excluded.result_json,
                    created_at = excluded.created_at,
                    last_accessed_at = excluded.last_accessed_at,
                    access_count = excluded.access_count
                "#,
                params![
                    entry.key.as_str(),
                    entry.source_input,
                    entry.target_variant,
                    result_json,
                    entry.created_at.timestamp_millis(),
                    entry.last_accessed_at.timestamp_millis(),
                    access_count,
                ],
            )?;
            Ok(())
        })
    }

    fn delete_expired(&self, key: &CacheKey, cutoff: DateTime<Utc>) -> StorageResult<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM translation_cache WHERE key = ?1 AND created_at < ?2",
                params![key.as_str(), cutoff.timestamp_millis()],
            )?;
            Ok(removed > 0)
        })
    }

    fn record_access(&self, key: &CacheKey, at: DateTime<Utc>) -> StorageResult<()> {
        // Incremented in SQL so concurrent readers in other processes never lose a count.
        self.with_conn(|conn| {
            conn.execute(
                r#"
                UPDATE translation_cache
                SET access_count = access_count + 1,
                    last_accessed_at = MAX(last_accessed_at, ?2)
                WHERE key = ?1
                "#,
                params![key.as_str(), at.timestamp_millis()],
            )?;
            Ok(())
        })
    }

    fn delete_created_before(&self, cutoff: DateTime<Utc>) -> StorageResult<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM translation_cache WHERE created_at < ?1",
                params![cutoff.timestamp_millis()],
            )?)
        })
    }

    fn count(&self) -> StorageResult<usize> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM translation_cache", [], |row| row.get(0))?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
    }
}
