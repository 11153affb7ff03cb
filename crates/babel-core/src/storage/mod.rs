//! Storage layer for Babel Core.
//!
//! This module provides the durable second cache tier: a document-style
//! store addressed by exact cache key, persisted in SQLite and shared by
//! every process pointed at the same database file.

// SQL strings don't need hash-less raw strings
#![allow(clippy::needless_raw_string_hashes)]

pub mod database;
pub mod durable_cache;
pub mod entry_store;
pub mod error;
pub mod types;

pub use database::Database;
pub use durable_cache::TierTwoCache;
pub use entry_store::{EntryStore, SqliteEntryStore};
pub use error::{StorageError, StorageResult};
pub use types::CacheEntry;
