// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent queue of mutations waiting to be replayed.
//!
//! Uses JSONL format for durability - each mutation is written as a single line
//! and fsynced before `append` returns. In-place edits (head removal, attempt
//! counters, temp id rewrites, cancellation marks) rewrite the whole file
//! through a temp file and rename. Queue order is the replay order: entries are
//! only ever appended at the tail and removed from the head, and only by the
//! holder of a [`FlushPermit`].

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use fs2::FileExt;
use tally_core::{jsonl, MutationId, QueuedMutation, RecordId};

const QUEUE_FILE: &str = "queue.jsonl";
const SEQ_FILE: &str = "queue.seq";
const LOCK_FILE: &str = "queue.lock";

/// Error type for queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The mutation failed validation at the queue boundary.
    #[error("rejected mutation: {0}")]
    Invalid(tally_core::Error),

    /// Appending would break FIFO order.
    #[error("mutation {id} is not newer than the queue tail {tail}")]
    OutOfOrder { id: MutationId, tail: MutationId },

    #[error("mutation {0} is not in the queue")]
    UnknownMutation(MutationId),

    /// Another process owns this queue.
    #[error("queue at {0} is locked by another process")]
    Locked(PathBuf),
}

impl From<tally_core::Error> for QueueError {
    fn from(e: tally_core::Error) -> Self {
        match e {
            tally_core::Error::Io(e) => QueueError::Io(e),
            tally_core::Error::Json(e) => QueueError::Serialization(e),
            other => QueueError::Invalid(other),
        }
    }
}

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Mutual-exclusion flag for flush cycles: at most one flush is in flight.
#[derive(Debug, Default)]
pub struct FlushLock {
    flushing: AtomicBool,
}

impl FlushLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the lock if no flush is running.
    pub fn try_acquire(&self) -> Option<FlushPermit<'_>> {
        self.flushing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlushPermit { lock: self })
    }

    pub fn is_held(&self) -> bool {
        self.flushing.load(Ordering::Acquire)
    }
}

/// Proof that the caller runs the one active flush cycle. Released on drop.
#[derive(Debug)]
pub struct FlushPermit<'a> {
    lock: &'a FlushLock,
}

impl Drop for FlushPermit<'_> {
    fn drop(&mut self) {
        self.lock.flushing.store(false, Ordering::Release);
    }
}

/// Durable FIFO of queued mutations.
pub struct PersistentQueue {
    /// Path to the queue file.
    path: PathBuf,
    /// High-water mark of allocated ids, written when the queue drains.
    seq_path: PathBuf,
    entries: VecDeque<QueuedMutation>,
    next_id: MutationId,
    /// Held for the lifetime of the queue; the OS releases it on drop.
    _lock: File,
}

impl PersistentQueue {
    /// Create or open the queue stored in `dir`.
    pub fn open(dir: &Path) -> QueueResult<Self> {
        std::fs::create_dir_all(dir)?;

        let lock_path = dir.join(LOCK_FILE);
        let lock = OpenOptions::new().create(true).truncate(false).write(true).open(&lock_path)?;
        lock.try_lock_exclusive().map_err(|_| QueueError::Locked(lock_path.clone()))?;

        let path = dir.join(QUEUE_FILE);
        let seq_path = dir.join(SEQ_FILE);
        let loaded = jsonl::read_all::<QueuedMutation>(&path)?;
        if has_torn_tail(&path)? {
            tracing::warn!(path = %path.display(), "dropping incomplete trailing queue entry");
            jsonl::write_all(&path, &loaded)?;
        }
        let entries: VecDeque<QueuedMutation> = loaded.into();

        let persisted = std::fs::read_to_string(&seq_path)
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(MutationId)
            .unwrap_or(MutationId(1));
        let after_tail = entries.back().map(|m| m.id.next()).unwrap_or(MutationId(1));
        let next_id = persisted.max(after_tail);

        Ok(PersistentQueue { path, seq_path, entries, next_id, _lock: lock })
    }

    /// Returns the path to the queue file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Allocates the id for the next mutation. Ids are never reused.
    pub fn allocate_id(&mut self) -> MutationId {
        let id = self.next_id;
        self.next_id = id.next();
        id
    }

    /// Append a mutation at the tail.
    ///
    /// The mutation is persisted to disk before this returns.
    pub fn append(&mut self, mutation: &QueuedMutation) -> QueueResult<()> {
        mutation.validate().map_err(QueueError::Invalid)?;
        if let Some(tail) = self.entries.back() {
            if mutation.id <= tail.id {
                return Err(QueueError::OutOfOrder { id: mutation.id, tail: tail.id });
            }
        }

        jsonl::append(&self.path, mutation)?;
        self.entries.push_back(mutation.clone());
        if mutation.id >= self.next_id {
            self.next_id = mutation.id.next();
        }
        Ok(())
    }

    pub fn peek_head(&self) -> Option<&QueuedMutation> {
        self.entries.front()
    }

    /// Remove the head after its terminal outcome is known.
    pub fn remove_head(&mut self, _permit: &FlushPermit<'_>) -> QueueResult<Option<QueuedMutation>> {
        if self.entries.is_empty() {
            return Ok(None);
        }
        let mut next = self.entries.clone();
        let head = next.pop_front();
        self.commit(next)?;
        Ok(head)
    }

    /// Remove the head and rewrite every later reference to `from` as `to`, in one write.
    ///
    /// Used when a creation confirms: dependent mutations must carry the
    /// server id before the next entry is dispatched.
    pub fn remove_head_rewriting(
        &mut self,
        _permit: &FlushPermit<'_>,
        from: &RecordId,
        to: &RecordId,
    ) -> QueueResult<(Option<QueuedMutation>, usize)> {
        let mut next = self.entries.clone();
        let head = next.pop_front();
        let rewritten = rewrite_targets(&mut next, from, to);
        self.commit(next)?;
        Ok((head, rewritten))
    }

    /// Remove the head and mark `ids` as cancelled by it, in one write.
    ///
    /// Used when the head fails permanently and later mutations on the same
    /// record can no longer be applied.
    pub fn remove_head_cancelling(
        &mut self,
        _permit: &FlushPermit<'_>,
        ids: &[MutationId],
        cause: MutationId,
    ) -> QueueResult<Option<QueuedMutation>> {
        let mut next = self.entries.clone();
        let head = next.pop_front();
        mark_cancelled(&mut next, ids, cause);
        self.commit(next)?;
        Ok(head)
    }

    /// Records another transient failure of `id`, returning the new count.
    pub fn increment_attempts(&mut self, id: MutationId) -> QueueResult<u32> {
        let mut next = self.entries.clone();
        let entry = next.iter_mut().find(|m| m.id == id).ok_or(QueueError::UnknownMutation(id))?;
        entry.attempts = entry.attempts.saturating_add(1);
        let attempts = entry.attempts;
        self.commit(next)?;
        Ok(attempts)
    }

    /// Rewrites the target of every queued mutation aimed at `from`.
    pub fn rewrite_target(&mut self, from: &RecordId, to: &RecordId) -> QueueResult<usize> {
        let mut next = self.entries.clone();
        let rewritten = rewrite_targets(&mut next, from, to);
        if rewritten > 0 {
            self.commit(next)?;
        }
        Ok(rewritten)
    }

    /// Marks mutations as cancelled by the rollback of `cause`.
    pub fn cancel(&mut self, ids: &[MutationId], cause: MutationId) -> QueueResult<usize> {
        let mut next = self.entries.clone();
        let cancelled = mark_cancelled(&mut next, ids, cause);
        if cancelled > 0 {
            self.commit(next)?;
        }
        Ok(cancelled)
    }

    /// All queued mutations in replay order.
    pub fn all(&self) -> Vec<QueuedMutation> {
        self.entries.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedMutation> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn commit(&mut self, mut next: VecDeque<QueuedMutation>) -> QueueResult<()> {
        if next.is_empty() {
            jsonl::write_atomic(&self.seq_path, self.next_id.0.to_string().as_bytes())?;
        }
        jsonl::write_all(&self.path, next.make_contiguous())?;
        self.entries = next;
        Ok(())
    }
}

fn mark_cancelled(entries: &mut VecDeque<QueuedMutation>, ids: &[MutationId], cause: MutationId) -> usize {
    let mut cancelled = 0;
    for entry in entries.iter_mut().filter(|m| ids.contains(&m.id) && m.cancelled_by.is_none()) {
        entry.cancelled_by = Some(cause);
        cancelled += 1;
    }
    cancelled
}

/// A crash mid-append leaves a final line without its newline.
fn has_torn_tail(path: &Path) -> QueueResult<bool> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(bytes.last().is_some_and(|b| *b != b'\n')),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn rewrite_targets(entries: &mut VecDeque<QueuedMutation>, from: &RecordId, to: &RecordId) -> usize {
    let mut rewritten = 0;
    for entry in entries.iter_mut().filter(|m| &m.target == from) {
        entry.target = to.clone();
        rewritten += 1;
    }
    rewritten
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
