// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Which cache entries a confirmed mutation makes stale.
//!
//! | kind         | drop                                | refresh       |
//! |--------------|-------------------------------------|---------------|
//! | create       | lists, stats                        | record        |
//! | update       | record, lists, stats                | record        |
//! | delete       | record, lists, stats                |               |
//! | append_event | record, stats                       |               |
//!
//! Lists and stats are dropped by prefix since any of them may include the
//! record. Refreshed record entries hold the server's copy.

use tally_core::{CacheKey, CacheScope, MutationKind, RecordId, ServerRecord};

use crate::cache::{CacheStore, Invalidation};
use crate::config::CacheTtls;

/// Cache entries to drop after `kind` confirms on `record`.
pub fn invalidations(kind: MutationKind, resource: &str, record: &RecordId) -> Vec<Invalidation> {
    let record_key = || Invalidation::key(&CacheKey::record(resource, record));
    let lists = || Invalidation::scope(resource, CacheScope::List);
    let stats = || Invalidation::scope(resource, CacheScope::Stats);

    match kind {
        MutationKind::Create => vec![lists(), stats()],
        MutationKind::Update | MutationKind::Delete => vec![record_key(), lists(), stats()],
        MutationKind::AppendEvent => vec![record_key(), stats()],
    }
}

/// Whether the server's copy of the record is written back to the cache.
pub fn refreshes_record(kind: MutationKind) -> bool {
    matches!(kind, MutationKind::Create | MutationKind::Update)
}

/// Applies the policy for a confirmed mutation. Cache failures are logged
/// and otherwise ignored.
pub fn apply(
    cache: &dyn CacheStore,
    ttls: &CacheTtls,
    kind: MutationKind,
    resource: &str,
    record: &RecordId,
    server: Option<&ServerRecord>,
) {
    for target in invalidations(kind, resource, record) {
        match cache.invalidate(&target) {
            Ok(removed) => tracing::trace!(?target, removed, "cache invalidated"),
            Err(e) => tracing::warn!(?target, error = %e, "cache invalidation failed"),
        }
    }

    if !refreshes_record(kind) {
        return;
    }
    let Some(server) = server else {
        return;
    };
    let key = CacheKey::record(resource, &server.id);
    let stored = serde_json::to_vec(server)
        .map_err(crate::cache::CacheError::from)
        .and_then(|bytes| cache.set(key.as_str(), bytes, ttls.for_scope(CacheScope::Record)));
    if let Err(e) = stored {
        tracing::warn!(key = key.as_str(), error = %e, "cache refresh failed");
    }
}

#[cfg(test)]
#[path = "invalidation_tests.rs"]
mod tests;
