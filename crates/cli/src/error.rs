// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use tally_sync::{CacheError, QueueError, RemoteError, SyncError};

/// All errors surfaced by the `tally` command line.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not initialized: run 'tally init' first")]
    NotInitialized,

    #[error("already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("no resource given\n  hint: pass --resource or set default_resource in .tally/config.toml")]
    NoResource,

    #[error("invalid field '{arg}': {reason}\n  hint: fields are written key=value")]
    InvalidField { arg: String, reason: String },

    #[error("{field} cannot be empty")]
    FieldEmpty { field: &'static str },

    #[error("invalid timestamp: {reason}")]
    InvalidTimestamp { reason: String },

    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("sync failed: {0}")]
    SyncFailed(String),

    #[error("{0}")]
    Invalid(#[from] tally_core::Error),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("queue error: {0}\n  hint: is another tally process running?")]
    Queue(#[from] QueueError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
