// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Optimistic record state.
//!
//! Every queued mutation is applied here before it reaches the server. The
//! manager keeps the record as it looked before each pending mutation so a
//! permanent failure can put it back. Only records with pending mutations
//! live here; once the last one settles the server copy in the cache is
//! authoritative again.

use std::collections::BTreeMap;

use tally_core::{
    Error, MutationId, MutationKind, MutationPayload, QueuedMutation, Record, RecordId, Result,
    ServerEvent, ServerRecord,
};

/// What a mutation did to the local record set.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// The record as it now reads locally.
    Upserted(Record),
    /// The record is hidden until the delete confirms.
    Removed(RecordId),
}

/// The server's answer to a dispatched mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerOutcome {
    Record(ServerRecord),
    Event(ServerEvent),
    Deleted,
}

/// Result of confirming a mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    /// The record's id after confirmation (server-assigned for creations).
    pub record_id: RecordId,
    /// The temp id that was replaced, for creations.
    pub temp_id: Option<RecordId>,
    /// The record as it reads after confirmation; `None` once deleted.
    pub record: Option<Record>,
    /// The server copy, when the server returned one.
    pub server: Option<ServerRecord>,
}

/// Result of undoing a mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct RolledBack {
    pub record_id: RecordId,
    /// The record as restored; `None` if it did not exist before.
    pub restored: Option<Record>,
    /// Later pending mutations on the same record, undone along with it.
    pub dependents: Vec<MutationId>,
}

#[derive(Debug, Clone)]
struct Snapshot {
    record_id: RecordId,
    kind: MutationKind,
    /// The record before the mutation was applied.
    prior: Option<Record>,
}

#[derive(Debug, Default)]
pub struct OptimisticState {
    records: BTreeMap<RecordId, Record>,
    snapshots: BTreeMap<MutationId, Snapshot>,
}

impl OptimisticState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds pending state from the durable queue after a restart.
    ///
    /// Cancelled entries are skipped. The first pending mutation on a server
    /// record starts from `base(resource, id)`, as it did when submitted.
    /// Entries that cannot be applied are returned so the caller can report
    /// them; they will still be dispatched.
    pub fn hydrate(
        &mut self,
        queue: &[QueuedMutation],
        base: impl Fn(&str, &RecordId) -> Option<Record>,
    ) -> Vec<(MutationId, Error)> {
        self.records.clear();
        self.snapshots.clear();

        let mut rejected = Vec::new();
        for mutation in queue.iter().filter(|m| !m.is_cancelled()) {
            let target = &mutation.target;
            let start = (mutation.kind() != MutationKind::Create
                && !target.is_temp()
                && !self.records.contains_key(target))
            .then(|| base(&mutation.resource, target))
            .flatten();
            if let Err(e) = self.apply_on(mutation, start) {
                tracing::warn!(mutation = %mutation.id, error = %e, "could not restore optimistic state");
                rejected.push((mutation.id, e));
            }
        }
        rejected
    }

    /// Applies `mutation` to the in-memory record set.
    pub fn apply_optimistic(&mut self, mutation: &QueuedMutation) -> Result<Applied> {
        self.apply_on(mutation, None)
    }

    /// Like [`apply_optimistic`](Self::apply_optimistic), starting from
    /// `base` (usually the cached server copy) when the target has nothing
    /// pending. The base is not part of the rollback snapshot: undoing the
    /// mutation hands the record back to the cache.
    pub fn apply_on(&mut self, mutation: &QueuedMutation, base: Option<Record>) -> Result<Applied> {
        if self.snapshots.contains_key(&mutation.id) {
            return Err(invalid(mutation.id, "mutation already applied"));
        }

        let target = &mutation.target;
        let prior = self.records.get(target).cloned();

        if mutation.kind() != MutationKind::Create {
            if target.is_temp() && prior.is_none() {
                return Err(invalid(mutation.id, "no pending creation for temp id"));
            }
            if prior.as_ref().is_some_and(|r| r.deleted) {
                return Err(Error::RecordNotFound(target.to_string()));
            }
        } else if prior.is_some() {
            return Err(invalid(mutation.id, "temp id already in use"));
        }

        let partial = || {
            base.clone()
                .unwrap_or_else(|| Record::new(target.clone(), mutation.resource.clone(), Default::default()))
        };
        let mut record = match &mutation.payload {
            MutationPayload::Create { fields } => {
                Record::new(target.clone(), mutation.resource.clone(), fields.clone())
            }
            MutationPayload::Update { fields } => {
                let mut record = prior.clone().unwrap_or_else(partial);
                for (key, value) in fields {
                    record.fields.insert(key.clone(), value.clone());
                }
                record
            }
            MutationPayload::Delete => {
                let mut record = prior.clone().unwrap_or_else(partial);
                record.deleted = true;
                record
            }
            MutationPayload::AppendEvent { event } => {
                let mut record = prior.clone().unwrap_or_else(partial);
                record.events.push(event.clone());
                record
            }
        };
        record.pending.insert(mutation.id);

        self.snapshots.insert(
            mutation.id,
            Snapshot { record_id: target.clone(), kind: mutation.kind(), prior },
        );
        let applied = if record.deleted {
            Applied::Removed(target.clone())
        } else {
            Applied::Upserted(record.clone())
        };
        self.records.insert(target.clone(), record);
        Ok(applied)
    }

    /// Confirms a mutation with the server's answer.
    ///
    /// For creations, the temp id is replaced by the server id everywhere in
    /// this manager; rewriting queued references is the queue's job.
    pub fn reconcile(&mut self, id: MutationId, outcome: ServerOutcome) -> Result<Reconciled> {
        let snapshot = self.snapshots.get(&id).ok_or(Error::UnknownMutation(id.0))?;
        let record_id = snapshot.record_id.clone();

        if snapshot.kind == MutationKind::Create {
            let ServerOutcome::Record(server) = outcome else {
                return Err(reconciliation(id, "creation confirmed without a server record"));
            };
            if !self.records.contains_key(&record_id) {
                return Err(reconciliation(id, format!("temp record {record_id} vanished")));
            }
            self.snapshots.remove(&id);
            self.rename(&record_id, &server.id);
            let record = self.settle(&server.id, id, Some(&server));
            return Ok(Reconciled {
                record_id: server.id.clone(),
                temp_id: Some(record_id),
                record,
                server: Some(server),
            });
        }

        let kind = snapshot.kind;
        self.snapshots.remove(&id);
        match kind {
            MutationKind::Delete => {
                self.records.remove(&record_id);
                Ok(Reconciled { record_id, temp_id: None, record: None, server: None })
            }
            MutationKind::AppendEvent => {
                if let Some(record) = self.records.get_mut(&record_id) {
                    if !record.events.is_empty() {
                        record.events.remove(0);
                    }
                }
                let record = self.settle(&record_id, id, None);
                Ok(Reconciled { record_id, temp_id: None, record, server: None })
            }
            _ => {
                let server = match outcome {
                    ServerOutcome::Record(server) => Some(server),
                    _ => None,
                };
                let record = self.settle(&record_id, id, server.as_ref());
                Ok(Reconciled { record_id, temp_id: None, record, server })
            }
        }
    }

    /// Undoes a mutation the server rejected, along with every later pending
    /// mutation on the same record.
    pub fn rollback(&mut self, id: MutationId) -> Result<RolledBack> {
        let snapshot = self.snapshots.remove(&id).ok_or(Error::UnknownMutation(id.0))?;

        let dependents: Vec<MutationId> = self
            .snapshots
            .range(id.next()..)
            .filter(|(_, s)| s.record_id == snapshot.record_id)
            .map(|(dep, _)| *dep)
            .collect();
        for dep in &dependents {
            self.snapshots.remove(dep);
        }

        let restored = match snapshot.prior {
            Some(mut prior) => {
                prior.pending.retain(|p| self.snapshots.contains_key(p));
                if prior.is_pending() {
                    self.records.insert(snapshot.record_id.clone(), prior.clone());
                } else {
                    self.records.remove(&snapshot.record_id);
                }
                Some(prior)
            }
            None => {
                self.records.remove(&snapshot.record_id);
                None
            }
        };

        Ok(RolledBack { record_id: snapshot.record_id, restored, dependents })
    }

    /// The local copy of a record with pending mutations, tombstones included.
    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.records.get(id)
    }

    pub fn is_pending(&self, id: &RecordId) -> bool {
        self.records.get(id).is_some_and(Record::is_pending)
    }

    /// Pending records of one resource type, tombstones included.
    pub fn records_for<'a>(&'a self, resource: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        self.records.values().filter(move |r| r.resource == resource)
    }

    pub fn pending_records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Number of mutations not yet confirmed or rolled back.
    pub fn pending_mutations(&self) -> usize {
        self.snapshots.len()
    }

    /// Drops `id` from a record's pending set, and the record itself once
    /// nothing is pending. Returns how the record reads now.
    fn settle(
        &mut self,
        record_id: &RecordId,
        id: MutationId,
        server: Option<&ServerRecord>,
    ) -> Option<Record> {
        let Some(record) = self.records.get_mut(record_id) else {
            return server.map(Record::from_server);
        };
        record.pending.remove(&id);
        if record.is_pending() {
            return Some(record.clone());
        }

        let mut settled = self.records.remove(record_id)?;
        if let Some(server) = server {
            settled.fields = server.fields.clone();
            if !server.resource.is_empty() {
                settled.resource = server.resource.clone();
            }
        }
        Some(settled)
    }

    /// Moves a record and every snapshot that refers to it to a new id.
    fn rename(&mut self, from: &RecordId, to: &RecordId) {
        if let Some(mut record) = self.records.remove(from) {
            record.id = to.clone();
            self.records.insert(to.clone(), record);
        }
        for snapshot in self.snapshots.values_mut().filter(|s| &s.record_id == from) {
            snapshot.record_id = to.clone();
            if let Some(prior) = snapshot.prior.as_mut() {
                prior.id = to.clone();
            }
        }
    }
}

fn invalid(id: MutationId, reason: &str) -> Error {
    Error::InvalidMutation { id: id.0, reason: reason.to_string() }
}

fn reconciliation(id: MutationId, reason: impl Into<String>) -> Error {
    Error::Reconciliation { mutation_id: id.0, reason: reason.into() }
}

#[cfg(test)]
#[path = "optimistic_tests.rs"]
mod tests;
