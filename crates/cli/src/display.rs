// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use serde_json::Value;
use tally_core::{MutationPayload, QueuedMutation, Record};
use tally_sync::{Connectivity, FlushReport, MutationFailure, StopReason, SyncEvent};

/// Maximum width of the fields column before it is cut with "...".
const FIELDS_WIDTH: usize = 72;

/// Compact one-line rendering of a field map or value.
pub fn compact(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() <= FIELDS_WIDTH {
        return text;
    }
    let cut: String = text.chars().take(FIELDS_WIDTH - 3).collect();
    format!("{cut}...")
}

/// Format a single record line for list output
pub fn format_record_line(record: &Record) -> String {
    let mut line = format!("- {}: {}", record.id, compact(&Value::Object(record.fields.clone())));
    if record.is_pending() {
        line.push_str(" (pending)");
    }
    line
}

/// Format record details for a single-record view
pub fn format_record_details(record: &Record) -> Vec<String> {
    let mut lines = vec![format!("{} {}", record.resource, record.id)];
    for (key, value) in &record.fields {
        lines.push(format!("  {key}: {}", compact(value)));
    }
    for event in &record.events {
        lines.push(format!("  event {} at {}", event.name, event.occurred_at.format("%Y-%m-%d %H:%M")));
    }
    if record.is_pending() {
        let ids: Vec<String> = record.pending.iter().map(ToString::to_string).collect();
        lines.push(format!("  pending: {}", ids.join(", ")));
    }
    lines
}

/// Format a queued mutation for `pending`
pub fn format_mutation_line(mutation: &QueuedMutation) -> String {
    let mut line = format!(
        "  {}  {}  {} {}/{}",
        mutation.enqueued_at.format("%Y-%m-%d %H:%M"),
        mutation.id,
        mutation.kind(),
        mutation.resource,
        mutation.target
    );
    match &mutation.payload {
        MutationPayload::Create { fields } | MutationPayload::Update { fields } => {
            line.push(' ');
            line.push_str(&compact(&Value::Object(fields.clone())));
        }
        MutationPayload::AppendEvent { event } => {
            line.push_str(&format!(" \"{}\"", event.name));
        }
        MutationPayload::Delete => {}
    }
    if mutation.attempts > 0 {
        line.push_str(&format!(" (attempts: {})", mutation.attempts));
    }
    if let Some(cause) = mutation.cancelled_by {
        line.push_str(&format!(" (cancelled by {cause})"));
    }
    line
}

pub fn format_failure(failure: &MutationFailure) -> String {
    format!("  failed {failure}")
}

/// One-line summary of a flush cycle.
pub fn format_flush_summary(report: &FlushReport, remaining: usize) -> String {
    let head = match report.stopped {
        StopReason::AlreadyFlushing => return "Another sync is already running".to_string(),
        StopReason::Drained => "Synced",
        StopReason::Offline => "Went offline after syncing",
    };
    let mut line = format!("{head} {} mutation(s)", report.confirmed.len());
    if !report.failures.is_empty() {
        line.push_str(&format!(", {} failed", report.failures.len()));
    }
    if remaining > 0 {
        line.push_str(&format!(", {remaining} pending"));
    }
    line
}

pub fn format_last_sync(last_sync: Option<DateTime<Utc>>) -> String {
    match last_sync {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "never".to_string(),
    }
}

/// Format an engine event for `watch`
pub fn format_event(event: &SyncEvent) -> String {
    match event {
        SyncEvent::Connectivity(Connectivity::Online) => "online".to_string(),
        SyncEvent::Connectivity(Connectivity::Offline) => "offline".to_string(),
        SyncEvent::MutationQueued { mutation_id, record_id } => {
            format!("queued {mutation_id} for {record_id}")
        }
        SyncEvent::FlushStarted => "sync started".to_string(),
        SyncEvent::MutationConfirmed { mutation_id, record_id, temp_id } => match temp_id {
            Some(temp) => format!("confirmed {mutation_id}: {temp} is now {record_id}"),
            None => format!("confirmed {mutation_id} for {record_id}"),
        },
        SyncEvent::MutationFailed(failure) => format!("failed {failure}"),
        SyncEvent::FlushFinished(summary) => {
            let mut line =
                format!("sync finished: {} confirmed, {} failed", summary.confirmed, summary.failed);
            if summary.remaining > 0 {
                line.push_str(&format!(", {} pending", summary.remaining));
            }
            line
        }
    }
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
