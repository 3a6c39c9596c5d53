// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Identifiers for queued mutations and records.
//!
//! Mutation ids are a local sequence used only for ordering. Record ids are
//! either server-assigned or temporary placeholders of the form
//! `temp-{enqueued_ms}-{mutation_id}` for creations not yet confirmed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Prefix shared by every temporary record id.
pub const TEMP_PREFIX: &str = "temp-";

/// Monotonically increasing local sequence number of a queued mutation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MutationId(pub u64);

impl MutationId {
    /// Returns the id that follows this one.
    pub fn next(self) -> Self {
        MutationId(self.0.saturating_add(1))
    }
}

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a record, server-assigned or temporary.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    /// Parses and validates a record id.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() || id.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(Error::InvalidRecordId(id));
        }
        Ok(RecordId(id))
    }

    /// Generates the temporary id for a creation queued at `enqueued_ms`.
    pub fn temp(enqueued_ms: u64, mutation_id: MutationId) -> Self {
        RecordId(format!("{TEMP_PREFIX}{enqueued_ms}-{}", mutation_id.0))
    }

    /// Returns true for locally generated placeholder ids.
    pub fn is_temp(&self) -> bool {
        self.0.starts_with(TEMP_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RecordId::new(s)
    }
}

impl TryFrom<String> for RecordId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        RecordId::new(s)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
