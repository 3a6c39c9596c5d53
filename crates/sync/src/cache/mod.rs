// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Response cache with per-entry TTL and prefix invalidation.
//!
//! Expiry is checked lazily: an expired entry is dropped the first time a
//! read sees it. Reads never fail; a backend error is logged and the entry
//! is reported absent so the caller falls back to the remote service.

mod memory;
mod sqlite;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

use chrono::{DateTime, Duration, Utc};
use tally_core::{CacheKey, CacheScope};

/// Error type for cache writes.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A cached response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub value: Vec<u8>,
    pub stored_at: DateTime<Utc>,
    pub ttl_secs: u64,
}

impl CacheEntry {
    pub fn expires_at(&self) -> DateTime<Utc> {
        let ttl = i64::try_from(self.ttl_secs).unwrap_or(i64::MAX);
        self.stored_at
            .checked_add_signed(Duration::try_seconds(ttl).unwrap_or(Duration::MAX))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// An entry is gone once `now` reaches `stored_at + ttl`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

/// What to drop from the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Invalidation {
    /// A single entry.
    Key(String),
    /// Every entry whose key starts with the prefix.
    Prefix(String),
}

impl Invalidation {
    pub fn key(key: &CacheKey) -> Self {
        Invalidation::Key(key.as_str().to_string())
    }

    /// All views of one scope for a resource, e.g. every cached `habit` list.
    pub fn scope(resource: &str, scope: CacheScope) -> Self {
        Invalidation::Prefix(CacheKey::scope_prefix(resource, scope))
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            Invalidation::Key(k) => k == key,
            Invalidation::Prefix(prefix) => key.starts_with(prefix.as_str()),
        }
    }
}

/// Storage backend for cached responses.
pub trait CacheStore: Send + Sync {
    /// Returns the entry, or `None` if it is missing, expired, or unreadable.
    fn get(&self, key: &str) -> Option<CacheEntry>;

    /// Stores `value` under `key`, replacing any previous entry.
    fn set(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<(), CacheError>;

    /// Removes matching entries and returns how many were dropped.
    fn invalidate(&self, target: &Invalidation) -> Result<usize, CacheError>;

    /// Removes every expired entry.
    fn purge_expired(&self) -> Result<usize, CacheError>;

    /// Number of live entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
