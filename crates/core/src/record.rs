// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Records as held optimistically in memory and as returned by the server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::id::{MutationId, RecordId};
use crate::mutation::{EventDraft, Fields};

/// A record in the optimistic in-memory set.
///
/// A record with pending mutations is never cache-consistent: reads of it
/// return this copy rather than anything cached from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub resource: String,
    pub fields: Fields,
    /// Events logged locally and not yet confirmed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventDraft>,
    /// Tombstone for a delete that has not been confirmed yet.
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub pending: BTreeSet<MutationId>,
}

impl Record {
    pub fn new(id: RecordId, resource: impl Into<String>, fields: Fields) -> Self {
        Record {
            id,
            resource: resource.into(),
            fields,
            events: Vec::new(),
            deleted: false,
            pending: BTreeSet::new(),
        }
    }

    pub fn from_server(server: &ServerRecord) -> Self {
        Record::new(server.id.clone(), server.resource.clone(), server.fields.clone())
    }

    pub fn is_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// The server-shaped view of this record, used when overlaying list pages.
    pub fn to_server_record(&self) -> ServerRecord {
        ServerRecord {
            id: self.id.clone(),
            resource: self.resource.clone(),
            fields: self.fields.clone(),
            updated_at: None,
        }
    }
}

/// A record as confirmed by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRecord {
    pub id: RecordId,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// An event as confirmed by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEvent {
    pub id: String,
    pub record_id: RecordId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// One page of a list query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>) -> Self {
        Page { items, next_cursor: None }
    }
}

/// Query parameters of a list call, kept sorted so they hash deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListParams(BTreeMap<String, String>);

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Form-encoded `k1=v1&k2=v2` with keys in sorted order.
    pub fn canonical(&self) -> String {
        form_urlencoded::Serializer::new(String::new()).extend_pairs(self.0.iter()).finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ListParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        ListParams(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
