// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tally-sync: offline-first sync and response cache.
//!
//! # Architecture
//!
//! ```text
//! caller ──► SyncEngine ──► OptimisticState   (applied immediately)
//!                │    └───► PersistentQueue   (durable FIFO)
//!                │
//!                ├── NetworkMonitor ── online edge ──► flush cycle
//!                │                                        │
//!                ▼                                        ▼
//!           CacheStore ◄── invalidation policy ◄── RemoteClient
//! ```
//!
//! Mutations are applied locally, written to the queue, and replayed in
//! order when the remote is reachable. Reads go through the cache, with
//! records that still have pending mutations served from local state.

pub mod backoff;
pub mod cache;
pub mod config;
mod engine;
mod error;
pub mod invalidation;
pub mod network;
pub mod optimistic;
pub mod queue;
pub mod remote;
mod report;

pub use backoff::{BackoffPolicy, ExponentialBackoff};
pub use cache::{CacheEntry, CacheError, CacheStore, Invalidation, MemoryCache, SqliteCache};
pub use config::{CacheTtls, SyncConfig};
pub use engine::{SyncEngine, SyncEngineBuilder};
pub use error::{SyncError, SyncResult};
pub use network::{spawn_probe, Connectivity, ConnectivityProbe, NetworkMonitor};
pub use optimistic::{Applied, OptimisticState, ServerOutcome};
pub use queue::{FlushLock, FlushPermit, PersistentQueue, QueueError};
pub use remote::{
    FailureClass, HttpProbe, HttpRemoteClient, RemoteClient, RemoteError, RemoteErrorKind,
};
pub use report::{
    Dispatch, FailureReason, FlushReport, FlushSummary, MutationFailure, StopReason, Submitted,
    SyncEvent,
};

#[cfg(test)]
mod test_helpers;
