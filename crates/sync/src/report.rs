// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Outcomes of flush cycles and the events the engine broadcasts.

use std::fmt;

use tally_core::{MutationId, MutationKind, QueuedMutation, RecordId};

use crate::network::Connectivity;
use crate::optimistic::Applied;
use crate::remote::RemoteError;

/// Why a mutation was dropped from the queue without being confirmed.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// The server refused it.
    Rejected(RemoteError),
    /// Transient failures used up the retry budget.
    RetriesExhausted { attempts: u32, last: RemoteError },
    /// An earlier mutation on the same record was rolled back.
    DependencyRolledBack { cause: MutationId },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Rejected(e) => write!(f, "rejected by server ({e})"),
            FailureReason::RetriesExhausted { attempts, last } => {
                write!(f, "gave up after {attempts} attempts ({last})")
            }
            FailureReason::DependencyRolledBack { cause } => {
                write!(f, "depends on {cause}, which was rolled back")
            }
        }
    }
}

/// A mutation that failed permanently, with the record it touched.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationFailure {
    pub mutation_id: MutationId,
    pub kind: MutationKind,
    pub resource: String,
    pub record_id: RecordId,
    pub reason: FailureReason,
}

impl MutationFailure {
    pub fn new(mutation: &QueuedMutation, reason: FailureReason) -> Self {
        MutationFailure {
            mutation_id: mutation.id,
            kind: mutation.kind(),
            resource: mutation.resource.clone(),
            record_id: mutation.target.clone(),
            reason,
        }
    }
}

impl fmt::Display for MutationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}/{}: {}",
            self.mutation_id, self.kind, self.resource, self.record_id, self.reason
        )
    }
}

/// Why a flush cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The queue is empty.
    Drained,
    /// Connectivity dropped; the head stays queued for the next cycle.
    Offline,
    /// Another cycle was already running.
    AlreadyFlushing,
}

/// What one flush cycle did.
#[derive(Debug, Clone, PartialEq)]
pub struct FlushReport {
    /// Confirmed mutations, in dispatch order.
    pub confirmed: Vec<MutationId>,
    pub failures: Vec<MutationFailure>,
    pub stopped: StopReason,
}

impl FlushReport {
    pub(crate) fn new() -> Self {
        FlushReport { confirmed: Vec::new(), failures: Vec::new(), stopped: StopReason::Drained }
    }

    pub(crate) fn already_flushing() -> Self {
        FlushReport { stopped: StopReason::AlreadyFlushing, ..Self::new() }
    }

    pub fn summary(&self, remaining: usize) -> FlushSummary {
        FlushSummary {
            confirmed: self.confirmed.len(),
            failed: self.failures.len(),
            remaining,
            stopped: self.stopped,
        }
    }
}

/// Counts broadcast when a cycle ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushSummary {
    pub confirmed: usize,
    pub failed: usize,
    /// Queue length when the cycle ended.
    pub remaining: usize,
    pub stopped: StopReason,
}

/// A mutation accepted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Submitted {
    pub mutation: QueuedMutation,
    /// How the mutation reads locally.
    pub applied: Applied,
}

/// Result of [`crate::SyncEngine::enqueue_if_offline`].
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Offline: the mutation waits in the queue.
    Queued(Submitted),
    /// Online: a flush ran right away.
    Flushed(Submitted, FlushReport),
}

impl Dispatch {
    pub fn submitted(&self) -> &Submitted {
        match self {
            Dispatch::Queued(s) | Dispatch::Flushed(s, _) => s,
        }
    }
}

/// Broadcast to subscribers of [`crate::SyncEngine::subscribe`].
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Connectivity(Connectivity),
    MutationQueued { mutation_id: MutationId, record_id: RecordId },
    FlushStarted,
    MutationConfirmed { mutation_id: MutationId, record_id: RecordId, temp_id: Option<RecordId> },
    MutationFailed(MutationFailure),
    FlushFinished(FlushSummary),
}
