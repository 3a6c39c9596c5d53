// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed cache that survives restarts.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use tally_core::{clock, ClockSource, SystemClock};

use super::{CacheEntry, CacheError, CacheStore, Invalidation};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL,
    stored_at INTEGER NOT NULL,
    ttl_secs INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_expiry
    ON cache_entries(stored_at, ttl_secs);
"#;

/// Expiry test shared by every statement: `now >= stored_at + ttl`.
const EXPIRED: &str = "?1 >= stored_at + ttl_secs * 1000";

pub struct SqliteCache {
    conn: Mutex<Connection>,
    clock: Arc<dyn ClockSource>,
}

impl SqliteCache {
    /// Opens or creates the cache database at `path`.
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_connection(Connection::open(path)?, Arc::new(SystemClock))
    }

    pub fn open_in_memory() -> Result<Self, CacheError> {
        Self::from_connection(Connection::open_in_memory()?, Arc::new(SystemClock))
    }

    /// Replaces the clock used for timestamps and expiry checks.
    pub fn with_clock(mut self, clock: Arc<dyn ClockSource>) -> Self {
        self.clock = clock;
        self
    }

    fn from_connection(conn: Connection, clock: Arc<dyn ClockSource>) -> Result<Self, CacheError> {
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteCache { conn: Mutex::new(conn), clock })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn now_ms(&self) -> i64 {
        i64::try_from(self.clock.now_ms()).unwrap_or(i64::MAX)
    }

    fn try_get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let now = self.now_ms();
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT value, stored_at, ttl_secs FROM cache_entries WHERE key = ?1",
                params![key],
                |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?)),
            )
            .optional()?;

        let Some((value, stored_at, ttl_secs)) = row else {
            return Ok(None);
        };

        let entry = CacheEntry {
            key: key.to_string(),
            value,
            stored_at: clock::from_millis(u64::try_from(stored_at).unwrap_or(0)),
            ttl_secs: u64::try_from(ttl_secs).unwrap_or(0),
        };
        if entry.is_expired(clock::from_millis(u64::try_from(now).unwrap_or(0))) {
            conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
            return Ok(None);
        }
        Ok(Some(entry))
    }
}

impl CacheStore for SqliteCache {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        match self.try_get(key) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<(), CacheError> {
        let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX / 1000);
        self.conn().execute(
            "INSERT OR REPLACE INTO cache_entries (key, value, stored_at, ttl_secs) VALUES (?1, ?2, ?3, ?4)",
            params![key, value, self.now_ms(), ttl],
        )?;
        Ok(())
    }

    fn invalidate(&self, target: &Invalidation) -> Result<usize, CacheError> {
        let conn = self.conn();
        let removed = match target {
            Invalidation::Key(key) => {
                conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?
            }
            Invalidation::Prefix(prefix) => conn.execute(
                "DELETE FROM cache_entries WHERE substr(key, 1, length(?1)) = ?1",
                params![prefix],
            )?,
        };
        Ok(removed)
    }

    fn purge_expired(&self) -> Result<usize, CacheError> {
        let sql = format!("DELETE FROM cache_entries WHERE {EXPIRED}");
        Ok(self.conn().execute(&sql, params![self.now_ms()])?)
    }

    fn len(&self) -> usize {
        let sql = format!("SELECT COUNT(*) FROM cache_entries WHERE NOT ({EXPIRED})");
        let count = self.conn().query_row(&sql, params![self.now_ms()], |row| row.get::<_, i64>(0));
        match count {
            Ok(n) => usize::try_from(n).unwrap_or(0),
            Err(e) => {
                tracing::warn!(error = %e, "cache count failed");
                0
            }
        }
    }
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
