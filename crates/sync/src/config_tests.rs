// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;

#[test]
fn defaults_match_documented_values() {
    let config = SyncConfig::default();
    assert_eq!(config.max_attempts, 5);
    assert_eq!(config.backoff_base_ms, 1_000);
    assert_eq!(config.backoff_cap_secs, 30);
    assert_eq!(config.request_timeout(), Duration::from_secs(15));
    assert_eq!(config.probe_interval(), Duration::from_secs(30));
    assert_eq!(config.cache.for_scope(CacheScope::List), 300);
    assert_eq!(config.cache.for_scope(CacheScope::Stats), 900);
    assert_eq!(config.cache.for_scope(CacheScope::Record), 300);
}

#[test]
fn empty_document_uses_defaults() {
    let config: SyncConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, SyncConfig::default());
}

#[test]
fn partial_document_overrides_only_given_fields() {
    let config: SyncConfig =
        serde_json::from_str(r#"{"max_attempts": 2, "cache": {"stats_secs": 60}}"#).unwrap();
    assert_eq!(config.max_attempts, 2);
    assert_eq!(config.backoff_base_ms, 1_000);
    assert_eq!(config.cache.stats_secs, 60);
    assert_eq!(config.cache.list_secs, 300);
}

#[test]
fn backoff_from_config() {
    let config = SyncConfig { backoff_base_ms: 10, backoff_cap_secs: 1, ..SyncConfig::default() };
    let backoff = config.backoff();
    assert_eq!(backoff.base, Duration::from_millis(10));
    assert_eq!(backoff.cap, Duration::from_secs(1));
}
