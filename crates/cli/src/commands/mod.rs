// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod init;
pub mod list;
pub mod mutate;
pub mod pending;
pub mod show;
pub mod status;
pub mod sync;
#[cfg(test)]
#[path = "mod_tests.rs"]
pub mod testing;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use tally_core::{
    EventDraft, Fields, ListParams, MutationRequest, Page, RecordId, ServerEvent, ServerRecord,
};
use tally_sync::network::probe_once;
use tally_sync::remote::RemoteFuture;
use tally_sync::{
    CacheStore, Connectivity, ConnectivityProbe, Dispatch, FlushReport, HttpProbe,
    HttpRemoteClient, MemoryCache, PersistentQueue, RemoteClient, RemoteError, RemoteErrorKind,
    SqliteCache, StopReason, SyncEngine, SyncEvent,
};
use tokio::sync::broadcast::error::TryRecvError;

use crate::config::{cache_path, find_work_dir, log_path, Config};
use crate::error::Result;
use crate::last_sync::LastSync;

/// An opened `.tally` directory: config plus an engine over its queue and cache.
pub struct Session {
    pub work_dir: PathBuf,
    pub config: Config,
    pub engine: SyncEngine,
    probe: Option<Arc<dyn ConnectivityProbe>>,
}

/// Helper to open the session from the current context.
pub fn open_session() -> Result<Session> {
    let work_dir = find_work_dir()?;
    crate::logging::setup(&log_path(&work_dir));
    let config = Config::load(&work_dir)?;
    Session::open(work_dir, config)
}

impl Session {
    pub fn open(work_dir: PathBuf, config: Config) -> Result<Self> {
        let (remote, probe): (Arc<dyn RemoteClient>, Option<Arc<dyn ConnectivityProbe>>) =
            match &config.remote {
                Some(remote) => (
                    Arc::new(HttpRemoteClient::new(&remote.url, remote.token())?),
                    Some(Arc::new(HttpProbe::new(&remote.url)?)),
                ),
                None => (Arc::new(NoRemote), None),
            };

        // The cache is an optimization: run without persistence rather than fail.
        let cache: Arc<dyn CacheStore> = match SqliteCache::open(&cache_path(&work_dir)) {
            Ok(cache) => Arc::new(cache),
            Err(e) => {
                tracing::warn!(error = %e, "cache unavailable, using memory only");
                Arc::new(MemoryCache::new())
            }
        };

        let queue = PersistentQueue::open(&work_dir)?;
        let engine = SyncEngine::builder(queue, remote)
            .config(config.sync.clone())
            .cache(cache)
            .last_sync(LastSync::new(&work_dir).read())
            .build();
        Ok(Session { work_dir, config, engine, probe })
    }

    /// Wraps an already built engine.
    pub fn with_engine(
        work_dir: PathBuf,
        config: Config,
        engine: SyncEngine,
        probe: Option<Arc<dyn ConnectivityProbe>>,
    ) -> Self {
        Session { work_dir, config, engine, probe }
    }

    pub fn has_remote(&self) -> bool {
        self.probe.is_some()
    }

    pub fn probe_handle(&self) -> Option<Arc<dyn ConnectivityProbe>> {
        self.probe.clone()
    }

    /// Probes the remote once and feeds the result to the engine's monitor.
    /// Without a remote the engine stays offline.
    pub async fn probe(&self) -> Connectivity {
        match &self.probe {
            Some(probe) => probe_once(self.engine.monitor(), probe.as_ref()).await,
            None => self.engine.connectivity(),
        }
    }

    pub fn resource(&self, explicit: Option<String>) -> Result<String> {
        self.config.resource(explicit)
    }

    /// Persists the engine's last sync time after a cycle that drained the queue.
    pub fn record_sync(&self, report: &FlushReport) -> Result<()> {
        if report.stopped != StopReason::Drained {
            return Ok(());
        }
        if let Some(at) = self.engine.last_sync() {
            LastSync::new(&self.work_dir).update(at)?;
        }
        Ok(())
    }
}

/// A mutation handed to the engine, with the id its record ended up under.
#[derive(Debug)]
pub struct Submission {
    pub dispatch: Dispatch,
    /// The server id once a creation is confirmed, else the submitted target.
    pub record_id: RecordId,
}

/// Probes once, then queues the mutation or syncs it right away when online.
pub async fn submit(session: &Session, request: MutationRequest) -> Result<Submission> {
    session.probe().await;
    let mut events = session.engine.subscribe();
    let dispatch = session.engine.enqueue_if_offline(request).await?;

    let submitted = dispatch.submitted();
    let mut record_id = submitted.mutation.target.clone();
    loop {
        match events.try_recv() {
            Ok(SyncEvent::MutationConfirmed { mutation_id, record_id: confirmed, .. })
                if mutation_id == submitted.mutation.id =>
            {
                record_id = confirmed;
            }
            Ok(_) | Err(TryRecvError::Lagged(_)) => {}
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }

    if let Dispatch::Flushed(_, report) = &dispatch {
        session.record_sync(report)?;
    }
    Ok(Submission { dispatch, record_id })
}

/// Stand-in remote for a directory with no `[remote]` configured. The engine
/// never dispatches to it because nothing reports the monitor online.
struct NoRemote;

impl NoRemote {
    fn fail<'a, T: Send + 'a>() -> RemoteFuture<'a, T> {
        Box::pin(async { Err(RemoteError::new(RemoteErrorKind::Config, "no remote configured")) })
    }
}

impl RemoteClient for NoRemote {
    fn create<'a>(&'a self, _: &'a str, _: &'a Fields) -> RemoteFuture<'a, ServerRecord> {
        Self::fail()
    }

    fn update<'a>(&'a self, _: &'a RecordId, _: &'a Fields) -> RemoteFuture<'a, ServerRecord> {
        Self::fail()
    }

    fn delete<'a>(&'a self, _: &'a RecordId) -> RemoteFuture<'a, ()> {
        Self::fail()
    }

    fn append_event<'a>(&'a self, _: &'a RecordId, _: &'a EventDraft) -> RemoteFuture<'a, ServerEvent> {
        Self::fail()
    }

    fn list<'a>(&'a self, _: &'a str, _: &'a ListParams) -> RemoteFuture<'a, Page<ServerRecord>> {
        Self::fail()
    }

    fn get<'a>(&'a self, _: &'a RecordId) -> RemoteFuture<'a, ServerRecord> {
        Self::fail()
    }
}
