// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tally_core::{ClockSource, SystemClock};

use super::{CacheEntry, CacheError, CacheStore, Invalidation};

/// In-process cache, lost on restart.
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    clock: Arc<dyn ClockSource>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn ClockSource>) -> Self {
        MemoryCache { entries: Mutex::new(HashMap::new()), clock }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        let now = self.clock.now();
        let mut entries = self.entries();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.clone()),
            None => None,
        }
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<(), CacheError> {
        let entry = CacheEntry { key: key.to_string(), value, stored_at: self.clock.now(), ttl_secs };
        self.entries().insert(key.to_string(), entry);
        Ok(())
    }

    fn invalidate(&self, target: &Invalidation) -> Result<usize, CacheError> {
        let mut entries = self.entries();
        let before = entries.len();
        match target {
            Invalidation::Key(key) => {
                entries.remove(key);
            }
            Invalidation::Prefix(_) => entries.retain(|key, _| !target.matches(key)),
        }
        Ok(before - entries.len())
    }

    fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = self.clock.now();
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok(before - entries.len())
    }

    fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries().values().filter(|e| !e.is_expired(now)).count()
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
