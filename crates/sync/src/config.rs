// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tunables for the sync engine.
//!
//! Every field has a default so a config file only needs the values it changes.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use tally_core::CacheScope;

/// Configuration for the sync engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Transient failures tolerated per mutation before it is treated as permanent (default: 5).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First backoff delay in milliseconds (default: 1000).
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Upper bound of the exponential part of the backoff in seconds (default: 30).
    #[serde(default = "default_backoff_cap_secs")]
    pub backoff_cap_secs: u64,
    /// Random jitter added on top of each delay, as a fraction of it (default: 0.2).
    #[serde(default = "default_backoff_jitter")]
    pub backoff_jitter: f64,
    /// Timeout of a single remote call in seconds (default: 15).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Connectivity probe interval in seconds when the host gives no push signal (default: 30).
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
    #[serde(default)]
    pub cache: CacheTtls,
}

/// Time-to-live per cache scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheTtls {
    /// List views (default: 300).
    #[serde(default = "default_list_secs")]
    pub list_secs: u64,
    /// Aggregate statistics (default: 900).
    #[serde(default = "default_stats_secs")]
    pub stats_secs: u64,
    /// Single records (default: 300).
    #[serde(default = "default_record_secs")]
    pub record_secs: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_backoff_base_ms() -> u64 {
    1_000
}

fn default_backoff_cap_secs() -> u64 {
    30
}

fn default_backoff_jitter() -> f64 {
    0.2
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_probe_interval_secs() -> u64 {
    30
}

fn default_list_secs() -> u64 {
    300
}

fn default_stats_secs() -> u64 {
    900
}

fn default_record_secs() -> u64 {
    300
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_secs: default_backoff_cap_secs(),
            backoff_jitter: default_backoff_jitter(),
            request_timeout_secs: default_request_timeout_secs(),
            probe_interval_secs: default_probe_interval_secs(),
            cache: CacheTtls::default(),
        }
    }
}

impl Default for CacheTtls {
    fn default() -> Self {
        CacheTtls {
            list_secs: default_list_secs(),
            stats_secs: default_stats_secs(),
            record_secs: default_record_secs(),
        }
    }
}

impl CacheTtls {
    pub fn for_scope(&self, scope: CacheScope) -> u64 {
        match scope {
            CacheScope::List => self.list_secs,
            CacheScope::Stats => self.stats_secs,
            CacheScope::Record => self.record_secs,
        }
    }
}

impl SyncConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    /// Builds the exponential backoff described by this config.
    pub fn backoff(&self) -> crate::backoff::ExponentialBackoff {
        crate::backoff::ExponentialBackoff {
            base: Duration::from_millis(self.backoff_base_ms),
            cap: Duration::from_secs(self.backoff_cap_secs),
            jitter: self.backoff_jitter,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
