// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic cache keys.
//!
//! Keys have the form `{resource}/{scope}/{suffix}`. List and stats suffixes
//! are a truncated SHA-256 of the canonical query parameters; record suffixes
//! are the record id. Sharing a `{resource}/{scope}/` prefix lets a single
//! invalidation drop every derived view of a resource.

use sha2::{Digest, Sha256};
use std::fmt;

use crate::id::RecordId;
use crate::record::ListParams;

/// Which kind of view a cache entry holds. Each scope has its own TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheScope {
    List,
    Stats,
    Record,
}

impl CacheScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheScope::List => "list",
            CacheScope::Stats => "stats",
            CacheScope::Record => "record",
        }
    }
}

impl fmt::Display for CacheScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    scope: CacheScope,
    key: String,
}

impl CacheKey {
    pub fn list(resource: &str, params: &ListParams) -> Self {
        Self::hashed(resource, CacheScope::List, params)
    }

    pub fn stats(resource: &str, params: &ListParams) -> Self {
        Self::hashed(resource, CacheScope::Stats, params)
    }

    pub fn record(resource: &str, id: &RecordId) -> Self {
        CacheKey {
            scope: CacheScope::Record,
            key: format!("{}{}", Self::scope_prefix(resource, CacheScope::Record), id),
        }
    }

    /// Prefix shared by every key of `resource` in `scope`.
    pub fn scope_prefix(resource: &str, scope: CacheScope) -> String {
        format!("{resource}/{scope}/")
    }

    fn hashed(resource: &str, scope: CacheScope, params: &ListParams) -> Self {
        let hash = Sha256::digest(params.canonical().as_bytes());
        let short_hash = hex::encode(&hash[..8]);
        CacheKey { scope, key: format!("{}{}", Self::scope_prefix(resource, scope), short_hash) }
    }

    pub fn scope(&self) -> CacheScope {
        self.scope
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.key
    }
}

#[cfg(test)]
#[path = "cache_key_tests.rs"]
mod tests;
