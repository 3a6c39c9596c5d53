// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use std::sync::Mutex;

/// Probe that replays a script, then repeats its last answer.
struct ScriptedProbe {
    script: Mutex<Vec<Connectivity>>,
    calls: Mutex<u32>,
}

impl ScriptedProbe {
    fn new(script: Vec<Connectivity>) -> Self {
        Self { script: Mutex::new(script), calls: Mutex::new(0) }
    }

    fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

impl ConnectivityProbe for ScriptedProbe {
    fn probe(&self) -> Pin<Box<dyn Future<Output = Connectivity> + Send + '_>> {
        *self.calls.lock().unwrap() += 1;
        let mut script = self.script.lock().unwrap();
        let next = if script.len() > 1 { script.remove(0) } else { script[0] };
        Box::pin(async move { next })
    }
}

#[test]
fn report_returns_true_only_on_edges() {
    let monitor = NetworkMonitor::new(Connectivity::Offline);
    assert!(!monitor.report(Connectivity::Offline));
    assert!(monitor.report(Connectivity::Online));
    assert!(!monitor.report(Connectivity::Online));
    assert!(monitor.mark_unreachable());
    assert_eq!(monitor.current(), Connectivity::Offline);
}

#[tokio::test]
async fn subscribers_wake_once_per_edge() {
    let monitor = NetworkMonitor::new(Connectivity::Offline);
    let mut rx = monitor.subscribe();

    monitor.report(Connectivity::Online);
    monitor.report(Connectivity::Online);
    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow_and_update(), Connectivity::Online);
    assert!(!rx.has_changed().unwrap());
}

#[test]
fn clones_share_state() {
    let monitor = NetworkMonitor::new(Connectivity::Online);
    let other = monitor.clone();
    other.mark_unreachable();
    assert!(!monitor.is_online());
}

#[test]
fn connectivity_serializes_snake_case() {
    assert_eq!(serde_json::to_string(&Connectivity::Online).unwrap(), "\"online\"");
    assert_eq!(Connectivity::Offline.to_string(), "offline");
}

#[tokio::test]
async fn probe_once_reports() {
    let monitor = NetworkMonitor::new(Connectivity::Offline);
    let probe = ScriptedProbe::new(vec![Connectivity::Online]);
    assert_eq!(probe_once(&monitor, &probe).await, Connectivity::Online);
    assert!(monitor.is_online());
}

#[tokio::test(start_paused = true)]
async fn spawn_probe_polls_on_interval_until_cancelled() {
    let monitor = NetworkMonitor::new(Connectivity::Offline);
    let probe = Arc::new(ScriptedProbe::new(vec![
        Connectivity::Offline,
        Connectivity::Online,
        Connectivity::Online,
    ]));
    let cancel = CancellationToken::new();
    let mut rx = monitor.subscribe();

    let handle =
        spawn_probe(monitor.clone(), probe.clone(), Duration::from_secs(30), cancel.clone());

    // First tick is immediate and reports offline (no edge); the second, 30s later, goes online.
    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow(), Connectivity::Online);
    assert_eq!(probe.calls(), 2);

    cancel.cancel();
    handle.await.unwrap();
}
