// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use tally_sync::network::spawn_probe;
use tally_sync::{StopReason, SyncEvent};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::display::format_event;
use crate::error::Result;
use crate::last_sync::LastSync;

use super::Session;

/// Shortest probe interval accepted on the command line.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

pub async fn run(session: &Session, interval: Option<u64>, shutdown: CancellationToken) -> Result<()> {
    run_impl(session, interval, shutdown, |line| println!("{line}")).await
}

/// Runs the probe loop and the sync worker until `shutdown` fires, handing
/// each engine event to `emit` as a display line.
pub(crate) async fn run_impl(
    session: &Session,
    interval: Option<u64>,
    shutdown: CancellationToken,
    mut emit: impl FnMut(String),
) -> Result<()> {
    let interval = interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| session.engine.config().probe_interval())
        .max(MIN_INTERVAL);

    let probe = match session.probe_handle() {
        Some(probe) => Some(spawn_probe(
            session.engine.monitor().clone(),
            probe,
            interval,
            shutdown.child_token(),
        )),
        None => {
            emit("no remote configured; mutations stay queued".to_string());
            None
        }
    };

    let mut events = session.engine.subscribe();
    let worker = {
        let engine = session.engine.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { engine.run(shutdown).await })
    };

    let last_sync = LastSync::new(&session.work_dir);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            event = events.recv() => match event {
                Ok(event) => {
                    if let SyncEvent::FlushFinished(summary) = &event {
                        if summary.stopped == StopReason::Drained {
                            if let Some(at) = session.engine.last_sync() {
                                last_sync.update(at)?;
                            }
                        }
                    }
                    emit(format_event(&event));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "watch fell behind engine events");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    if let Err(e) = worker.await {
        tracing::warn!(error = %e, "sync worker ended abnormally");
    }
    if let Some(probe) = probe {
        probe.abort();
    }
    Ok(())
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
