// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The sync engine: accepts mutations, replays the queue, serves reads.
//!
//! # Flush cycle
//!
//! ```text
//!            ┌───────────── online && queue non-empty ─────────────┐
//!            │                                                      ▼
//!        ┌──────┐                                            ┌──────────┐
//!        │ Idle │◄──── drained / offline ────────────────────│ Flushing │
//!        └──────┘                                            └──────────┘
//!                                                                 │ head
//!                     success ─► reconcile, invalidate, remove head
//!                     transient ─► attempts += 1, backoff, retry head
//!                     permanent ─► rollback + dependents, remove head
//! ```
//!
//! Only one cycle runs at a time ([`FlushLock`]). Entry N+1 is not
//! dispatched until entry N's outcome is committed to the queue file.
//! Locks are taken in the order queue state, then optimistic state, and
//! never held across an await.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tally_core::{
    CacheKey, ClockSource, Error, ListParams, MutationPayload, MutationRequest, Page, QueuedMutation,
    Record, RecordId, ServerRecord, SystemClock,
};
use tokio::sync::{broadcast, watch, Notify};
use tokio_util::sync::CancellationToken;

use crate::backoff::BackoffPolicy;
use crate::cache::{CacheStore, MemoryCache};
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::invalidation;
use crate::network::{Connectivity, NetworkMonitor};
use crate::optimistic::{OptimisticState, ServerOutcome};
use crate::queue::{FlushLock, FlushPermit, PersistentQueue};
use crate::remote::{RemoteClient, RemoteError, RemoteErrorKind, RemoteResult};
use crate::report::{
    Dispatch, FailureReason, FlushReport, MutationFailure, StopReason, Submitted, SyncEvent,
};

/// Capacity of the event channel; slow subscribers miss older events.
const EVENT_CAPACITY: usize = 256;

/// Queue-side shared state, guarded by one mutex.
struct SyncState {
    queue: PersistentQueue,
    last_sync: Option<DateTime<Utc>>,
}

struct Inner {
    config: SyncConfig,
    remote: Arc<dyn RemoteClient>,
    cache: Arc<dyn CacheStore>,
    clock: Arc<dyn ClockSource>,
    backoff: Arc<dyn BackoffPolicy>,
    monitor: NetworkMonitor,
    state: Mutex<SyncState>,
    optimistic: Mutex<OptimisticState>,
    flush_lock: FlushLock,
    events: broadcast::Sender<SyncEvent>,
    wake: Notify,
}

/// Handle to the engine. Clones share the same state.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
}

pub struct SyncEngineBuilder {
    queue: PersistentQueue,
    remote: Arc<dyn RemoteClient>,
    config: SyncConfig,
    cache: Option<Arc<dyn CacheStore>>,
    clock: Option<Arc<dyn ClockSource>>,
    backoff: Option<Arc<dyn BackoffPolicy>>,
    monitor: Option<NetworkMonitor>,
    last_sync: Option<DateTime<Utc>>,
}

impl SyncEngineBuilder {
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Defaults to an in-memory cache.
    pub fn cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn ClockSource>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Defaults to the exponential backoff described by the config.
    pub fn backoff(mut self, backoff: Arc<dyn BackoffPolicy>) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Defaults to a monitor that starts offline.
    pub fn monitor(mut self, monitor: NetworkMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Restores the time of the last complete sync from a previous session.
    pub fn last_sync(mut self, last_sync: Option<DateTime<Utc>>) -> Self {
        self.last_sync = last_sync;
        self
    }

    /// Builds the engine, replaying queued mutations into optimistic state.
    pub fn build(self) -> SyncEngine {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let cache = self.cache.unwrap_or_else(|| Arc::new(MemoryCache::with_clock(clock.clone())));
        let backoff = self.backoff.unwrap_or_else(|| Arc::new(self.config.backoff()));
        let monitor = self.monitor.unwrap_or_else(|| NetworkMonitor::new(Connectivity::Offline));

        let mut optimistic = OptimisticState::new();
        let rejected = optimistic
            .hydrate(&self.queue.all(), |resource, id| cached_record(cache.as_ref(), resource, id));
        if !rejected.is_empty() {
            tracing::warn!(count = rejected.len(), "queued mutations without optimistic state");
        }

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        SyncEngine {
            inner: Arc::new(Inner {
                config: self.config,
                remote: self.remote,
                cache,
                clock,
                backoff,
                monitor,
                state: Mutex::new(SyncState { queue: self.queue, last_sync: self.last_sync }),
                optimistic: Mutex::new(optimistic),
                flush_lock: FlushLock::new(),
                events,
                wake: Notify::new(),
            }),
        }
    }
}

impl SyncEngine {
    pub fn builder(queue: PersistentQueue, remote: Arc<dyn RemoteClient>) -> SyncEngineBuilder {
        SyncEngineBuilder {
            queue,
            remote,
            config: SyncConfig::default(),
            cache: None,
            clock: None,
            backoff: None,
            monitor: None,
            last_sync: None,
        }
    }

    // -- Writes --

    /// Applies a mutation locally and queues it durably. Wakes the worker
    /// when online.
    pub fn submit(&self, request: MutationRequest) -> SyncResult<Submitted> {
        let submitted = self.enqueue(request)?;
        if self.inner.monitor.is_online() {
            self.inner.wake.notify_one();
        }
        Ok(submitted)
    }

    /// Queues a mutation and, when online, flushes immediately.
    pub async fn enqueue_if_offline(&self, request: MutationRequest) -> SyncResult<Dispatch> {
        let submitted = self.enqueue(request)?;
        if !self.inner.monitor.is_online() {
            return Ok(Dispatch::Queued(submitted));
        }
        let report = self.flush().await?;
        Ok(Dispatch::Flushed(submitted, report))
    }

    fn enqueue(&self, request: MutationRequest) -> SyncResult<Submitted> {
        let base = request
            .target
            .as_ref()
            .filter(|id| !id.is_temp())
            .and_then(|id| self.cached_record(&request.resource, id));

        let submitted = {
            let mut state = self.state();
            let mut optimistic = self.optimistic();

            let id = state.queue.allocate_id();
            let mutation = request.into_queued(id, self.inner.clock.now()).map_err(SyncError::Invalid)?;
            let applied = optimistic.apply_on(&mutation, base).map_err(SyncError::Invalid)?;
            if let Err(e) = state.queue.append(&mutation) {
                if let Err(undo) = optimistic.rollback(mutation.id) {
                    tracing::error!(mutation = %mutation.id, error = %undo, "could not undo optimistic change");
                }
                return Err(e.into());
            }
            Submitted { mutation, applied }
        };

        tracing::debug!(
            mutation = %submitted.mutation.id,
            kind = %submitted.mutation.kind(),
            target = %submitted.mutation.target,
            "queued mutation"
        );
        self.emit(SyncEvent::MutationQueued {
            mutation_id: submitted.mutation.id,
            record_id: submitted.mutation.target.clone(),
        });
        Ok(submitted)
    }

    // -- Flushing --

    /// Runs one flush cycle. Returns immediately with
    /// [`StopReason::AlreadyFlushing`] if another cycle is running.
    pub async fn flush(&self) -> SyncResult<FlushReport> {
        let Some(permit) = self.inner.flush_lock.try_acquire() else {
            tracing::debug!("flush already in progress");
            return Ok(FlushReport::already_flushing());
        };

        self.emit(SyncEvent::FlushStarted);
        let result = self.drain(&permit).await;
        drop(permit);

        match &result {
            Ok(report) => {
                let remaining = {
                    let mut state = self.state();
                    if report.stopped == StopReason::Drained {
                        state.last_sync = Some(self.inner.clock.now());
                    }
                    state.queue.len()
                };
                let summary = report.summary(remaining);
                tracing::info!(
                    confirmed = summary.confirmed,
                    failed = summary.failed,
                    remaining,
                    stopped = ?summary.stopped,
                    "flush finished"
                );
                self.emit(SyncEvent::FlushFinished(summary));
            }
            Err(e) => tracing::error!(error = %e, "flush aborted"),
        }
        result
    }

    async fn drain(&self, permit: &FlushPermit<'_>) -> SyncResult<FlushReport> {
        let mut report = FlushReport::new();

        loop {
            if !self.inner.monitor.is_online() {
                report.stopped = StopReason::Offline;
                break;
            }

            let head = self.state().queue.peek_head().cloned();
            let Some(head) = head else {
                report.stopped = StopReason::Drained;
                break;
            };

            if let Some(cause) = head.cancelled_by {
                tracing::debug!(mutation = %head.id, %cause, "dropping cancelled mutation");
                self.state().queue.remove_head(permit)?;
                continue;
            }

            tracing::debug!(mutation = %head.id, kind = %head.kind(), target = %head.target, attempts = head.attempts, "dispatching");
            match self.dispatch(&head).await {
                Ok(outcome) => self.confirm(permit, &head, outcome, &mut report)?,
                Err(e) if e.is_transient() => {
                    let attempts = self.state().queue.increment_attempts(head.id)?;
                    if e.is_connectivity() {
                        self.inner.monitor.mark_unreachable();
                    }
                    if attempts >= self.inner.config.max_attempts {
                        let reason = FailureReason::RetriesExhausted { attempts, last: e };
                        self.fail(permit, &head, reason, &mut report)?;
                        continue;
                    }

                    let delay = self.inner.backoff.delay(attempts);
                    tracing::warn!(mutation = %head.id, attempts, error = %e, ?delay, "transient failure, retrying");
                    if !self.inner.monitor.is_online() {
                        report.stopped = StopReason::Offline;
                        break;
                    }
                    self.sleep_unless_offline(delay).await;
                }
                Err(e) => self.fail(permit, &head, FailureReason::Rejected(e), &mut report)?,
            }
        }

        Ok(report)
    }

    async fn dispatch(&self, mutation: &QueuedMutation) -> RemoteResult<ServerOutcome> {
        let remote = &*self.inner.remote;
        let call = async {
            match &mutation.payload {
                MutationPayload::Create { fields } => {
                    remote.create(&mutation.resource, fields).await.map(ServerOutcome::Record)
                }
                MutationPayload::Update { fields } => {
                    remote.update(&mutation.target, fields).await.map(ServerOutcome::Record)
                }
                MutationPayload::Delete => {
                    remote.delete(&mutation.target).await.map(|()| ServerOutcome::Deleted)
                }
                MutationPayload::AppendEvent { event } => {
                    remote.append_event(&mutation.target, event).await.map(ServerOutcome::Event)
                }
            }
        };
        self.with_timeout(call).await
    }

    /// Commits a confirmed head: queue first, then local state and cache.
    fn confirm(
        &self,
        permit: &FlushPermit<'_>,
        head: &QueuedMutation,
        outcome: ServerOutcome,
        report: &mut FlushReport,
    ) -> SyncResult<()> {
        let reconciled = {
            let mut state = self.state();
            let mut optimistic = self.optimistic();

            match (&head.payload, &outcome) {
                (MutationPayload::Create { .. }, ServerOutcome::Record(server)) => {
                    let (_, rewritten) =
                        state.queue.remove_head_rewriting(permit, &head.target, &server.id)?;
                    tracing::debug!(temp = %head.target, id = %server.id, rewritten, "temp id replaced");
                }
                (MutationPayload::Create { .. }, _) => {
                    return Err(SyncError::Reconciliation(Error::Reconciliation {
                        mutation_id: head.id.0,
                        reason: "creation confirmed without a server record".to_string(),
                    }));
                }
                _ => {
                    state.queue.remove_head(permit)?;
                }
            }

            optimistic.reconcile(head.id, outcome).map_err(SyncError::Reconciliation)?
        };

        invalidation::apply(
            &*self.inner.cache,
            &self.inner.config.cache,
            head.kind(),
            &head.resource,
            &reconciled.record_id,
            reconciled.server.as_ref(),
        );

        report.confirmed.push(head.id);
        self.emit(SyncEvent::MutationConfirmed {
            mutation_id: head.id,
            record_id: reconciled.record_id,
            temp_id: reconciled.temp_id,
        });
        Ok(())
    }

    /// Drops a permanently failed head, rolls it back, and cancels every
    /// later mutation on the same record.
    fn fail(
        &self,
        permit: &FlushPermit<'_>,
        head: &QueuedMutation,
        reason: FailureReason,
        report: &mut FlushReport,
    ) -> SyncResult<()> {
        let dependents: Vec<QueuedMutation> = {
            let mut state = self.state();
            let mut optimistic = self.optimistic();

            let dependents: Vec<QueuedMutation> = state
                .queue
                .iter()
                .skip(1)
                .filter(|m| m.target == head.target && !m.is_cancelled())
                .cloned()
                .collect();
            let ids: Vec<_> = dependents.iter().map(|m| m.id).collect();

            state.queue.remove_head_cancelling(permit, &ids, head.id)?;

            match optimistic.rollback(head.id) {
                Ok(rolled) => {
                    tracing::debug!(record = %rolled.record_id, dependents = rolled.dependents.len(), "rolled back");
                }
                Err(e) => tracing::warn!(mutation = %head.id, error = %e, "nothing to roll back"),
            }
            dependents
        };

        tracing::warn!(mutation = %head.id, target = %head.target, %reason, "mutation failed");
        let mut failures = vec![MutationFailure::new(head, reason)];
        failures.extend(dependents.iter().map(|m| {
            MutationFailure::new(m, FailureReason::DependencyRolledBack { cause: head.id })
        }));

        for failure in failures {
            self.emit(SyncEvent::MutationFailed(failure.clone()));
            report.failures.push(failure);
        }
        Ok(())
    }

    /// Sleeps for `delay`, returning early if connectivity drops.
    async fn sleep_unless_offline(&self, delay: Duration) {
        let rx = self.inner.monitor.subscribe();
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = until_offline(rx) => {}
        }
    }

    async fn with_timeout<T>(&self, call: impl Future<Output = RemoteResult<T>>) -> RemoteResult<T> {
        let timeout = self.inner.config.request_timeout();
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::timeout(timeout)),
        }
    }

    // -- Worker --

    /// The single sync worker. Flushes on every offline-to-online edge, on
    /// any connectivity update that finds the monitor online with mutations
    /// still queued, and whenever [`submit`](Self::submit) queues a mutation
    /// while online.
    /// Returns when `shutdown` fires; a running flush cycle finishes first.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut connectivity = self.inner.monitor.subscribe();
        let mut last = *connectivity.borrow_and_update();
        if last.is_online() {
            self.flush_logged().await;
        }

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                changed = connectivity.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    // Updates can merge in the channel, so an offline blip
                    // may read as no change; pending work still counts.
                    let now = *connectivity.borrow_and_update();
                    let edge = now != last;
                    if edge {
                        last = now;
                        self.emit(SyncEvent::Connectivity(now));
                    }
                    if now.is_online() && (edge || self.pending_count() > 0) {
                        self.flush_logged().await;
                    }
                }
                _ = self.inner.wake.notified() => {
                    if self.inner.monitor.is_online() {
                        self.flush_logged().await;
                    }
                }
            }
        }
        tracing::debug!("sync worker stopped");
    }

    async fn flush_logged(&self) {
        // Errors are logged by flush; the next edge retries.
        let _ = self.flush().await;
    }

    // -- Reads --

    /// Reads one record: the optimistic copy while it has pending
    /// mutations, otherwise the cache, otherwise the server.
    pub async fn record(&self, resource: &str, id: &RecordId) -> SyncResult<Option<Record>> {
        let local = self.optimistic().get(id).cloned();
        if let Some(record) = local {
            return Ok((!record.deleted).then_some(record));
        }
        if id.is_temp() {
            return Ok(None);
        }

        let key = CacheKey::record(resource, id);
        let fetched = self
            .fetch_cached(&key, || async move { self.inner.remote.get(id).await })
            .await;
        match fetched {
            Ok(mut server) => {
                if server.resource.is_empty() {
                    server.resource = resource.to_string();
                }
                Ok(Some(Record::from_server(&server)))
            }
            Err(SyncError::Remote(e)) if e.kind == RemoteErrorKind::Status(404) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Lists records through the cache, with pending local changes laid
    /// over the server's page and unconfirmed creations appended.
    pub async fn list(&self, resource: &str, params: &ListParams) -> SyncResult<Page<Record>> {
        let key = CacheKey::list(resource, params);
        let page: Page<ServerRecord> = self
            .fetch_cached(&key, || async move { self.inner.remote.list(resource, params).await })
            .await?;

        let optimistic = self.optimistic();
        let mut items: Vec<Record> = Vec::with_capacity(page.items.len());
        for server in &page.items {
            match optimistic.get(&server.id) {
                Some(local) if local.deleted => {}
                Some(local) => items.push(local.clone()),
                None => items.push(Record::from_server(server)),
            }
        }
        items.extend(
            optimistic
                .records_for(resource)
                .filter(|r| r.id.is_temp() && !r.deleted)
                .cloned(),
        );

        Ok(Page { items, next_cursor: page.next_cursor })
    }

    /// Generic read-through: returns the cached value under `key`, or
    /// calls `fetch` and caches its result with the TTL of the key's scope.
    pub async fn fetch_cached<T, F, Fut>(&self, key: &CacheKey, fetch: F) -> SyncResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
    {
        if let Some(entry) = self.inner.cache.get(key.as_str()) {
            match serde_json::from_slice(&entry.value) {
                Ok(value) => return Ok(value),
                Err(e) => tracing::warn!(key = key.as_str(), error = %e, "unreadable cache entry"),
            }
        }

        if !self.inner.monitor.is_online() {
            return Err(SyncError::Offline(key.as_str().to_string()));
        }

        let value = match self.with_timeout(fetch()).await {
            Ok(value) => value,
            Err(e) => {
                if e.is_connectivity() {
                    self.inner.monitor.mark_unreachable();
                }
                return Err(e.into());
            }
        };

        let ttl = self.inner.config.cache.for_scope(key.scope());
        let stored = serde_json::to_vec(&value)
            .map_err(crate::cache::CacheError::from)
            .and_then(|bytes| self.inner.cache.set(key.as_str(), bytes, ttl));
        if let Err(e) = stored {
            tracing::warn!(key = key.as_str(), error = %e, "cache write failed");
        }
        Ok(value)
    }

    fn cached_record(&self, resource: &str, id: &RecordId) -> Option<Record> {
        cached_record(self.inner.cache.as_ref(), resource, id)
    }

    /// Queued mutations in replay order, cancelled ones included.
    pub fn pending(&self) -> Vec<QueuedMutation> {
        self.state().queue.all()
    }

    pub fn pending_count(&self) -> usize {
        self.state().queue.len()
    }

    /// Local records with unconfirmed changes.
    pub fn pending_records(&self) -> Vec<Record> {
        self.optimistic().pending_records().cloned().collect()
    }

    pub fn connectivity(&self) -> Connectivity {
        self.inner.monitor.current()
    }

    /// Feeds a host connectivity signal. Returns `true` on a transition.
    pub fn report_connectivity(&self, connectivity: Connectivity) -> bool {
        self.inner.monitor.report(connectivity)
    }

    pub fn monitor(&self) -> &NetworkMonitor {
        &self.inner.monitor
    }

    /// When a flush last emptied the queue.
    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.state().last_sync
    }

    pub fn is_flushing(&self) -> bool {
        self.inner.flush_lock.is_held()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.inner.events.subscribe()
    }

    /// Drops expired cache entries.
    pub fn purge_cache(&self) -> usize {
        match self.inner.cache.purge_expired() {
            Ok(purged) => purged,
            Err(e) => {
                tracing::warn!(error = %e, "cache purge failed");
                0
            }
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    fn state(&self) -> MutexGuard<'_, SyncState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn optimistic(&self) -> MutexGuard<'_, OptimisticState> {
        self.inner.optimistic.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Resolves once the monitor reports offline.
async fn until_offline(mut rx: watch::Receiver<Connectivity>) {
    loop {
        if !rx.borrow_and_update().is_online() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// The server copy of a record from the cache, if fresh.
fn cached_record(cache: &dyn CacheStore, resource: &str, id: &RecordId) -> Option<Record> {
    let entry = cache.get(CacheKey::record(resource, id).as_str())?;
    let server: ServerRecord = serde_json::from_slice(&entry.value).ok()?;
    let mut record = Record::from_server(&server);
    record.resource = resource.to_string();
    Some(record)
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
