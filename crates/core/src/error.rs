// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for tally-core operations.

use thiserror::Error;

/// All possible errors that can occur in tally-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid mutation {id}: {reason}")]
    InvalidMutation { id: u64, reason: String },

    #[error("invalid record id: '{0}'\n  hint: record ids must be non-empty and contain no whitespace or '/'")]
    InvalidRecordId(String),

    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("unknown mutation: {0}")]
    UnknownMutation(u64),

    #[error("reconciliation failed for mutation {mutation_id}: {reason}")]
    Reconciliation { mutation_id: u64, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for tally-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
