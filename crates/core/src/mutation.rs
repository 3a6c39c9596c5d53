// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Mutations issued against records.
//!
//! A [`MutationRequest`] is what a caller asks for. Once it has been assigned a
//! sequence number and a timestamp it becomes a [`QueuedMutation`], the unit
//! stored by the persistent queue and replayed against the remote service.
//! Payloads are a tagged union per kind and are validated before they are
//! allowed into the queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{Error, Result};
use crate::id::{MutationId, RecordId};

/// JSON object holding record fields.
pub type Fields = Map<String, Value>;

/// The four kinds of mutation the engine replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
    AppendEvent,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
            MutationKind::AppendEvent => "append_event",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discrete event logged against a record (e.g. "completed" for a habit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    pub name: String,
    pub occurred_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl EventDraft {
    pub fn new(name: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        EventDraft { name: name.into(), occurred_at, data: Value::Null }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// Payload describing the specific mutation being performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationPayload {
    /// Create a new record with the given fields.
    Create { fields: Fields },

    /// Overwrite the given fields of an existing record.
    Update { fields: Fields },

    /// Delete a record.
    Delete,

    /// Log an event against a record.
    AppendEvent { event: EventDraft },
}

impl MutationPayload {
    pub fn kind(&self) -> MutationKind {
        match self {
            MutationPayload::Create { .. } => MutationKind::Create,
            MutationPayload::Update { .. } => MutationKind::Update,
            MutationPayload::Delete => MutationKind::Delete,
            MutationPayload::AppendEvent { .. } => MutationKind::AppendEvent,
        }
    }
}

/// A mutation waiting in the offline queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedMutation {
    /// Local sequence number; orders replay.
    pub id: MutationId,
    /// Resource type of the target record (e.g. "habit").
    pub resource: String,
    /// Target record: a server id, or a temp id for unconfirmed creations.
    pub target: RecordId,
    pub payload: MutationPayload,
    pub enqueued_at: DateTime<Utc>,
    /// Transient failures seen so far.
    #[serde(default)]
    pub attempts: u32,
    /// Set when an earlier mutation on the same record was rolled back.
    /// Cancelled entries are dropped without being dispatched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<MutationId>,
}

impl QueuedMutation {
    pub fn kind(&self) -> MutationKind {
        self.payload.kind()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled_by.is_some()
    }

    /// Checks payload shape before the mutation is allowed into the queue.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidMutation { id: self.id.0, reason: reason.to_string() };

        validate_resource(&self.resource).map_err(|reason| invalid(&reason))?;

        match &self.payload {
            MutationPayload::Create { .. } => {
                if !self.target.is_temp() {
                    return Err(invalid("create must target a temp id"));
                }
            }
            MutationPayload::Update { fields } => {
                if fields.is_empty() {
                    return Err(invalid("update fields must not be empty"));
                }
            }
            MutationPayload::Delete => {}
            MutationPayload::AppendEvent { event } => {
                if event.name.trim().is_empty() {
                    return Err(invalid("event name must not be empty"));
                }
            }
        }

        Ok(())
    }
}

/// A mutation as issued by a caller, before it is sequenced.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRequest {
    pub resource: String,
    /// Required for everything but creations.
    pub target: Option<RecordId>,
    pub payload: MutationPayload,
}

impl MutationRequest {
    pub fn create(resource: impl Into<String>, fields: Fields) -> Self {
        MutationRequest {
            resource: resource.into(),
            target: None,
            payload: MutationPayload::Create { fields },
        }
    }

    pub fn update(resource: impl Into<String>, target: RecordId, fields: Fields) -> Self {
        MutationRequest {
            resource: resource.into(),
            target: Some(target),
            payload: MutationPayload::Update { fields },
        }
    }

    pub fn delete(resource: impl Into<String>, target: RecordId) -> Self {
        MutationRequest {
            resource: resource.into(),
            target: Some(target),
            payload: MutationPayload::Delete,
        }
    }

    pub fn append_event(resource: impl Into<String>, target: RecordId, event: EventDraft) -> Self {
        MutationRequest {
            resource: resource.into(),
            target: Some(target),
            payload: MutationPayload::AppendEvent { event },
        }
    }

    /// Assigns sequence number and timestamp, generating a temp id for creations.
    pub fn into_queued(self, id: MutationId, now: DateTime<Utc>) -> Result<QueuedMutation> {
        let target = match (&self.payload, self.target) {
            (MutationPayload::Create { .. }, _) => {
                let ms = u64::try_from(now.timestamp_millis()).unwrap_or(0);
                RecordId::temp(ms, id)
            }
            (_, Some(target)) => target,
            (_, None) => {
                return Err(Error::InvalidMutation {
                    id: id.0,
                    reason: format!("{} requires a target record", self.payload.kind()),
                });
            }
        };

        let mutation = QueuedMutation {
            id,
            resource: self.resource,
            target,
            payload: self.payload,
            enqueued_at: now,
            attempts: 0,
            cancelled_by: None,
        };
        mutation.validate()?;
        Ok(mutation)
    }
}

/// Resource names are used inside cache keys and URL paths.
pub fn validate_resource(resource: &str) -> std::result::Result<(), String> {
    if resource.is_empty() {
        return Err("resource must not be empty".to_string());
    }
    if !resource.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-') {
        return Err(format!(
            "invalid resource '{resource}': use lowercase letters, digits, '_' or '-'"
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "mutation_tests.rs"]
mod tests;
