// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use tally_sync::FlushReport;

use crate::display::{format_failure, format_flush_summary};
use crate::error::Result;

use super::Session;

/// What `tally sync` did.
#[derive(Debug)]
pub(crate) enum SyncOutcome {
    NoRemote { pending: usize },
    Offline { pending: usize },
    Flushed { report: FlushReport, remaining: usize },
}

pub async fn run(session: &Session) -> Result<()> {
    match run_impl(session).await? {
        SyncOutcome::NoRemote { pending } => {
            println!("No remote configured; {pending} mutation(s) pending");
        }
        SyncOutcome::Offline { pending } => {
            println!("Remote unreachable; {pending} mutation(s) pending");
        }
        SyncOutcome::Flushed { report, remaining } => {
            for failure in &report.failures {
                println!("{}", format_failure(failure));
            }
            println!("{}", format_flush_summary(&report, remaining));
        }
    }
    Ok(())
}

pub(crate) async fn run_impl(session: &Session) -> Result<SyncOutcome> {
    let purged = session.engine.purge_cache();
    if purged > 0 {
        tracing::debug!(purged, "dropped expired cache entries");
    }

    if !session.has_remote() {
        return Ok(SyncOutcome::NoRemote { pending: session.engine.pending_count() });
    }
    if !session.probe().await.is_online() {
        return Ok(SyncOutcome::Offline { pending: session.engine.pending_count() });
    }

    let report = session.engine.flush().await?;
    session.record_sync(&report)?;
    Ok(SyncOutcome::Flushed { report, remaining: session.engine.pending_count() })
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
