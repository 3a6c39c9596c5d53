// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity tracking.
//!
//! The [`NetworkMonitor`] holds the current [`Connectivity`] in a watch
//! channel and only publishes transitions, so subscribers wake once per
//! edge rather than once per report. Hosts with a push signal call
//! [`NetworkMonitor::report`]; others run [`spawn_probe`] on an interval.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Whether the remote service is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub fn is_online(self) -> bool {
        self == Connectivity::Online
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Connectivity::Online => "online",
            Connectivity::Offline => "offline",
        }
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared handle to the current connectivity state.
#[derive(Clone)]
pub struct NetworkMonitor {
    tx: Arc<watch::Sender<Connectivity>>,
}

impl NetworkMonitor {
    pub fn new(initial: Connectivity) -> Self {
        let (tx, _rx) = watch::channel(initial);
        NetworkMonitor { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Connectivity {
        *self.tx.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.current().is_online()
    }

    /// Records a connectivity signal. Returns `true` if it was a transition.
    pub fn report(&self, connectivity: Connectivity) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == connectivity {
                false
            } else {
                *current = connectivity;
                true
            }
        });
        if changed {
            tracing::info!(%connectivity, "connectivity changed");
        }
        changed
    }

    /// A remote call failed for connectivity reasons: treat as offline even
    /// if the host still reports a network.
    pub fn mark_unreachable(&self) -> bool {
        self.report(Connectivity::Offline)
    }

    /// Receiver that wakes on every transition.
    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.tx.subscribe()
    }
}

impl fmt::Debug for NetworkMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkMonitor").field("connectivity", &self.current()).finish()
    }
}

/// Active reachability check, used when the host has no push signal.
pub trait ConnectivityProbe: Send + Sync {
    fn probe(&self) -> Pin<Box<dyn Future<Output = Connectivity> + Send + '_>>;
}

/// Probe once and feed the result to the monitor.
pub async fn probe_once(monitor: &NetworkMonitor, probe: &dyn ConnectivityProbe) -> Connectivity {
    let connectivity = probe.probe().await;
    monitor.report(connectivity);
    connectivity
}

/// Probes on a fixed interval until `cancel` fires. The first probe runs immediately.
pub fn spawn_probe(
    monitor: NetworkMonitor,
    probe: Arc<dyn ConnectivityProbe>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("connectivity probe stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let connectivity = tokio::select! {
                _ = cancel.cancelled() => return,
                c = probe.probe() => c,
            };
            tracing::trace!(%connectivity, "probe result");
            monitor.report(connectivity);
        }
    })
}

#[cfg(test)]
#[path = "network_tests.rs"]
mod tests;
