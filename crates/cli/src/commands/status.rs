// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use tally_sync::Connectivity;

use crate::display::format_last_sync;
use crate::error::Result;
use crate::last_sync::LastSync;

use super::Session;

/// Snapshot printed by `tally status`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Status {
    pub remote: Option<String>,
    pub connectivity: Connectivity,
    pub pending: usize,
    pub last_sync: Option<DateTime<Utc>>,
}

pub async fn run(session: &Session) -> Result<()> {
    let status = run_impl(session).await;
    println!("remote: {}", status.remote.as_deref().unwrap_or("none"));
    println!("connectivity: {}", status.connectivity);
    println!("pending: {}", status.pending);
    println!("last sync: {}", format_last_sync(status.last_sync));
    Ok(())
}

pub(crate) async fn run_impl(session: &Session) -> Status {
    let connectivity = session.probe().await;
    Status {
        remote: session.config.remote_url().map(String::from),
        connectivity,
        pending: session.engine.pending_count(),
        last_sync: session.engine.last_sync().or_else(|| LastSync::new(&session.work_dir).read()),
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
