// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tally_core::{
    EventDraft, Fields, ListParams, ManualClock, MutationRequest, Page, RecordId, ServerEvent,
    ServerRecord,
};
use tempfile::TempDir;

use crate::backoff::BackoffPolicy;
use crate::cache::{CacheStore, MemoryCache};
use crate::config::SyncConfig;
use crate::engine::SyncEngine;
use crate::network::{Connectivity, NetworkMonitor};
use crate::queue::PersistentQueue;
use crate::remote::{RemoteClient, RemoteError, RemoteFuture};

/// A call received by [`MockRemote`].
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    Create { resource: String, fields: Fields },
    Update { id: RecordId, fields: Fields },
    Delete { id: RecordId },
    AppendEvent { id: RecordId, name: String },
    List { resource: String, params: ListParams },
    Get { id: RecordId },
}

impl RemoteCall {
    /// The record a mutation call was aimed at.
    pub fn target(&self) -> Option<&RecordId> {
        match self {
            RemoteCall::Update { id, .. }
            | RemoteCall::Delete { id }
            | RemoteCall::AppendEvent { id, .. }
            | RemoteCall::Get { id } => Some(id),
            RemoteCall::Create { .. } | RemoteCall::List { .. } => None,
        }
    }

    pub fn is_mutation(&self) -> bool {
        !matches!(self, RemoteCall::List { .. } | RemoteCall::Get { .. })
    }
}

/// Scripted answer for the next mutation call.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Succeed with a generated server response.
    Ok,
    /// Succeed, assigning this id to a creation.
    Created(&'static str),
    Err(RemoteError),
    /// Never answer.
    Hang,
}

/// In-memory remote service with scripted mutation responses.
///
/// Unscripted mutation calls succeed. Creations get ids `srv-1`, `srv-2`, ...
#[derive(Default)]
pub struct MockRemote {
    calls: Mutex<Vec<RemoteCall>>,
    script: Mutex<VecDeque<Scripted>>,
    latency: Mutex<Option<Duration>>,
    next_id: AtomicU64,
    pages: Mutex<HashMap<String, Page<ServerRecord>>>,
    records: Mutex<HashMap<RecordId, ServerRecord>>,
}

impl MockRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, scripted: Scripted) {
        self.script.lock().unwrap().push_back(scripted);
    }

    pub fn push_err(&self, error: RemoteError) {
        self.push(Scripted::Err(error));
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    pub fn set_page(&self, resource: &str, page: Page<ServerRecord>) {
        self.pages.lock().unwrap().insert(resource.to_string(), page);
    }

    pub fn set_record(&self, record: ServerRecord) {
        self.records.lock().unwrap().insert(record.id.clone(), record);
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutation_calls(&self) -> Vec<RemoteCall> {
        self.calls().into_iter().filter(RemoteCall::is_mutation).collect()
    }

    fn record(&self, call: RemoteCall) -> (Scripted, Option<Duration>) {
        self.calls.lock().unwrap().push(call);
        let scripted = self.script.lock().unwrap().pop_front().unwrap_or(Scripted::Ok);
        (scripted, *self.latency.lock().unwrap())
    }

    fn fresh_id(&self) -> String {
        format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

async fn settle(scripted: &Scripted, latency: Option<Duration>) -> Result<(), RemoteError> {
    if let Some(latency) = latency {
        tokio::time::sleep(latency).await;
    }
    match scripted {
        Scripted::Err(e) => Err(e.clone()),
        Scripted::Hang => std::future::pending().await,
        Scripted::Ok | Scripted::Created(_) => Ok(()),
    }
}

impl RemoteClient for MockRemote {
    fn create<'a>(&'a self, resource: &'a str, fields: &'a Fields) -> RemoteFuture<'a, ServerRecord> {
        let (scripted, latency) = self
            .record(RemoteCall::Create { resource: resource.to_string(), fields: fields.clone() });
        Box::pin(async move {
            settle(&scripted, latency).await?;
            let id = match scripted {
                Scripted::Created(id) => id.to_string(),
                _ => self.fresh_id(),
            };
            let record = ServerRecord {
                id: RecordId::new(id).unwrap(),
                resource: resource.to_string(),
                fields: fields.clone(),
                updated_at: Some(Utc::now()),
            };
            self.set_record(record.clone());
            Ok(record)
        })
    }

    fn update<'a>(&'a self, id: &'a RecordId, fields: &'a Fields) -> RemoteFuture<'a, ServerRecord> {
        let (scripted, latency) =
            self.record(RemoteCall::Update { id: id.clone(), fields: fields.clone() });
        Box::pin(async move {
            settle(&scripted, latency).await?;
            let mut records = self.records.lock().unwrap();
            let record = records.entry(id.clone()).or_insert_with(|| ServerRecord {
                id: id.clone(),
                resource: String::new(),
                fields: Fields::new(),
                updated_at: None,
            });
            for (key, value) in fields {
                record.fields.insert(key.clone(), value.clone());
            }
            record.updated_at = Some(Utc::now());
            Ok(record.clone())
        })
    }

    fn delete<'a>(&'a self, id: &'a RecordId) -> RemoteFuture<'a, ()> {
        let (scripted, latency) = self.record(RemoteCall::Delete { id: id.clone() });
        Box::pin(async move {
            settle(&scripted, latency).await?;
            self.records.lock().unwrap().remove(id);
            Ok(())
        })
    }

    fn append_event<'a>(
        &'a self,
        id: &'a RecordId,
        event: &'a EventDraft,
    ) -> RemoteFuture<'a, ServerEvent> {
        let (scripted, latency) =
            self.record(RemoteCall::AppendEvent { id: id.clone(), name: event.name.clone() });
        Box::pin(async move {
            settle(&scripted, latency).await?;
            Ok(ServerEvent {
                id: format!("evt-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
                record_id: id.clone(),
                name: event.name.clone(),
                occurred_at: event.occurred_at,
                data: event.data.clone(),
            })
        })
    }

    fn list<'a>(
        &'a self,
        resource: &'a str,
        params: &'a ListParams,
    ) -> RemoteFuture<'a, Page<ServerRecord>> {
        self.calls
            .lock()
            .unwrap()
            .push(RemoteCall::List { resource: resource.to_string(), params: params.clone() });
        let page = self.pages.lock().unwrap().get(resource).cloned();
        Box::pin(async move { Ok(page.unwrap_or_else(|| Page::new(Vec::new()))) })
    }

    fn get<'a>(&'a self, id: &'a RecordId) -> RemoteFuture<'a, ServerRecord> {
        self.calls.lock().unwrap().push(RemoteCall::Get { id: id.clone() });
        let record = self.records.lock().unwrap().get(id).cloned();
        Box::pin(async move {
            record.ok_or_else(|| RemoteError::status(404, format!("no record {id}")))
        })
    }
}

pub fn fields(value: Value) -> Fields {
    value.as_object().cloned().unwrap()
}

pub fn rid(id: &str) -> RecordId {
    RecordId::new(id).unwrap()
}

pub fn create(resource: &str, value: Value) -> MutationRequest {
    MutationRequest::create(resource, fields(value))
}

pub fn update(target: &RecordId, value: Value) -> MutationRequest {
    MutationRequest::update("habit", target.clone(), fields(value))
}

pub fn server_record(id: &str, value: Value) -> ServerRecord {
    ServerRecord { id: rid(id), resource: "habit".to_string(), fields: fields(value), updated_at: None }
}

/// Backoff that never waits, for tests that count attempts.
pub fn no_backoff() -> Arc<dyn BackoffPolicy> {
    Arc::new(|_attempts: u32| Duration::ZERO)
}

/// Engine over a temp-dir queue, a mock remote and a manual clock.
pub struct Harness {
    pub dir: TempDir,
    pub remote: Arc<MockRemote>,
    pub cache: Arc<MemoryCache>,
    pub clock: Arc<ManualClock>,
    pub monitor: NetworkMonitor,
    pub engine: SyncEngine,
}

impl Harness {
    pub fn new(connectivity: Connectivity) -> Self {
        Self::with_config(connectivity, SyncConfig::default(), no_backoff())
    }

    pub fn with_config(
        connectivity: Connectivity,
        config: SyncConfig,
        backoff: Arc<dyn BackoffPolicy>,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let remote = MockRemote::new();
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let cache = Arc::new(MemoryCache::with_clock(clock.clone()));
        let monitor = NetworkMonitor::new(connectivity);
        let engine = Self::engine(&dir, &remote, &cache, &clock, &monitor, config, backoff);
        Harness { dir, remote, cache, clock, monitor, engine }
    }

    /// Drops the engine (and its queue lock) and builds a new one over the same directory.
    pub fn restart(self) -> Self {
        let Harness { dir, remote, cache, clock, monitor, engine } = self;
        let config = engine.config().clone();
        drop(engine);
        let engine = Self::engine(&dir, &remote, &cache, &clock, &monitor, config, no_backoff());
        Harness { dir, remote, cache, clock, monitor, engine }
    }

    fn engine(
        dir: &TempDir,
        remote: &Arc<MockRemote>,
        cache: &Arc<MemoryCache>,
        clock: &Arc<ManualClock>,
        monitor: &NetworkMonitor,
        config: SyncConfig,
        backoff: Arc<dyn BackoffPolicy>,
    ) -> SyncEngine {
        let queue = PersistentQueue::open(dir.path()).unwrap();
        SyncEngine::builder(queue, remote.clone())
            .config(config)
            .cache(cache.clone() as Arc<dyn CacheStore>)
            .clock(clock.clone())
            .backoff(backoff)
            .monitor(monitor.clone())
            .build()
    }
}
