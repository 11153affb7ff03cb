//! Versioned cache key derivation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// How much of the input participates in the key.
///
/// `Prefix` is a lossy trade-off: two inputs that agree on their first `n`
/// characters map to the same key, so the second one is answered with the
/// first one's translation. Use it only where inputs are known to diverge
/// early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyPolicy {
    /// Hash the whole normalized input.
    #[default]
    FullInput,
    /// Hash only the first `n` characters (not bytes) of the normalized input.
    Prefix(usize),
}

/// Opaque, fixed-length (64 hex chars) lookup key for a translation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for `(input, target_variant, schema_version)`.
    ///
    /// Leading and trailing whitespace of `input` is ignored. Every component
    /// is length-framed before hashing so that component boundaries cannot
    /// shift into each other.
    #[must_use]
    pub fn derive(
        input: &str,
        target_variant: &str,
        schema_version: u32,
        policy: KeyPolicy,
    ) -> Self {
        let normalized = normalize(input, policy);

        let mut hasher = Sha256::new();
        hasher.update(b"babel-cache");
        hasher.update(schema_version.to_be_bytes());
        for component in [target_variant, normalized] {
            hasher.update((component.len() as u64).to_be_bytes());
            hasher.update(component.as_bytes());
        }

        Self(format!("{:x}", hasher.finalize()))
    }

    /// Wraps a key previously produced by [`CacheKey::derive`] and read back
    /// from storage.
    #[must_use]
    pub fn from_stored(raw: String) -> Self {
        Self(raw)
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn normalize(input: &str, policy: KeyPolicy) -> &str {
    let trimmed = input.trim();
    match policy {
        KeyPolicy::FullInput => trimmed,
        KeyPolicy::Prefix(chars) => match trimmed.char_indices().nth(chars) {
            Some((end, _)) => &trimmed[..end],
            None => trimmed,
        },
    }
}

/// Derives keys with a fixed schema version and policy.
///
/// One codec is built from configuration and shared by every request, so the
/// version and policy cannot drift between callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheKeyCodec {
    schema_version: u32,
    policy: KeyPolicy,
}

impl CacheKeyCodec {
    /// Creates a codec.
    #[must_use]
    pub const fn new(schema_version: u32, policy: KeyPolicy) -> Self {
        Self { schema_version, policy }
    }

    /// Derives the key for `input` translated into `target_variant`.
    #[must_use]
    pub fn derive(&self, input: &str, target_variant: &str) -> CacheKey {
        CacheKey::derive(input, target_variant, self.schema_version, self.policy)
    }

    /// The schema version mixed into every key.
    #[must_use]
    pub const fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// The truncation policy.
    #[must_use]
    pub const fn policy(&self) -> KeyPolicy {
        self.policy
    }
}
