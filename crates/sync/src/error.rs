// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Errors surfaced by the sync engine.

use thiserror::Error;

use crate::queue::QueueError;
use crate::remote::RemoteError;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The mutation was refused before it reached the queue.
    #[error("mutation rejected: {0}")]
    Invalid(tally_core::Error),

    /// The queue could not be read or written. Fatal to a flush cycle.
    #[error("queue storage failed: {0}")]
    Queue(#[from] QueueError),

    /// Local state and the server disagree in a way the ordering rules
    /// should make impossible.
    #[error("{0}")]
    Reconciliation(tally_core::Error),

    #[error("remote call failed: {0}")]
    Remote(#[from] RemoteError),

    /// A read missed the cache while offline.
    #[error("offline and no cached copy of {0}")]
    Offline(String),
}

impl SyncError {
    /// Whether the next flush can be expected to succeed without intervention.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Queue(_) | SyncError::Offline(_) => true,
            SyncError::Remote(e) => e.is_transient(),
            SyncError::Invalid(_) | SyncError::Reconciliation(_) => false,
        }
    }
}

/// Result type for sync engine operations.
pub type SyncResult<T> = Result<T, SyncError>;
