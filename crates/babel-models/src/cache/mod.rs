//! Translation caching primitives.
//!
//! This module provides the versioned key codec shared by both cache tiers
//! and the in-process first tier. The durable second tier lives next to the
//! storage layer in `babel-core`.

pub mod config;
pub mod key;
pub mod memory;

pub use config::{CacheConfig, CacheConfigError};
pub use key::{CacheKey, CacheKeyCodec, KeyPolicy};
pub use memory::TierOneCache;
