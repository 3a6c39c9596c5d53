// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `create`, `update`, `delete` and `log`: apply locally, then queue or sync.

use serde_json::json;
use tally_core::{EventDraft, MutationKind, MutationRequest, RecordId};
use tally_sync::{Dispatch, MutationFailure};

use crate::cli::OutputFormat;
use crate::error::{Error, Result};
use crate::fields::{parse_data, parse_fields, parse_timestamp};

use super::{submit, Session, Submission};

/// What became of the submitted mutation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Outcome {
    /// Waiting in the queue.
    Queued,
    /// Confirmed by the remote.
    Synced,
    Failed(MutationFailure),
}

impl Outcome {
    fn as_str(&self) -> &'static str {
        match self {
            Outcome::Queued => "queued",
            Outcome::Synced => "synced",
            Outcome::Failed(_) => "failed",
        }
    }
}

pub async fn create(
    session: &Session,
    resource: Option<String>,
    fields: &[String],
    output: OutputFormat,
) -> Result<()> {
    let resource = session.resource(resource)?;
    let fields = parse_fields(fields)?;
    let submission = submit(session, MutationRequest::create(resource, fields)).await?;
    report(&submission, output)
}

pub async fn update(
    session: &Session,
    id: &str,
    resource: Option<String>,
    fields: &[String],
    output: OutputFormat,
) -> Result<()> {
    let resource = session.resource(resource)?;
    let target = RecordId::new(id)?;
    let fields = parse_fields(fields)?;
    let submission = submit(session, MutationRequest::update(resource, target, fields)).await?;
    report(&submission, output)
}

pub async fn delete(session: &Session, id: &str, resource: Option<String>) -> Result<()> {
    let resource = session.resource(resource)?;
    let target = RecordId::new(id)?;
    let submission = submit(session, MutationRequest::delete(resource, target)).await?;
    report(&submission, OutputFormat::Text)
}

pub async fn log(
    session: &Session,
    id: &str,
    event: &str,
    data: Option<&str>,
    at: Option<&str>,
    resource: Option<String>,
) -> Result<()> {
    let resource = session.resource(resource)?;
    let target = RecordId::new(id)?;
    if event.trim().is_empty() {
        return Err(Error::FieldEmpty { field: "Event name" });
    }
    let draft = EventDraft::new(event, parse_timestamp(at)?).with_data(parse_data(data)?);
    let submission = submit(session, MutationRequest::append_event(resource, target, draft)).await?;
    report(&submission, OutputFormat::Text)
}

/// Classifies the dispatch from the point of view of the submitted mutation.
/// Failures of other queued mutations in the same flush come back separately.
pub(crate) fn outcome(dispatch: &Dispatch) -> (Outcome, Vec<MutationFailure>) {
    let report = match dispatch {
        Dispatch::Queued(_) => return (Outcome::Queued, Vec::new()),
        Dispatch::Flushed(_, report) => report,
    };
    let id = dispatch.submitted().mutation.id;
    let (own, others): (Vec<_>, Vec<_>) =
        report.failures.iter().cloned().partition(|f| f.mutation_id == id);

    let outcome = if let Some(failure) = own.into_iter().next() {
        Outcome::Failed(failure)
    } else if report.confirmed.contains(&id) {
        Outcome::Synced
    } else {
        Outcome::Queued
    };
    (outcome, others)
}

fn verb(kind: MutationKind) -> &'static str {
    match kind {
        MutationKind::Create => "Created",
        MutationKind::Update => "Updated",
        MutationKind::Delete => "Deleted",
        MutationKind::AppendEvent => "Logged event on",
    }
}

fn report(submission: &Submission, output: OutputFormat) -> Result<()> {
    let mutation = &submission.dispatch.submitted().mutation;
    let (outcome, others) = outcome(&submission.dispatch);
    for failure in &others {
        eprintln!("warning: {}", failure);
    }

    match output {
        OutputFormat::Id => println!("{}", submission.record_id),
        OutputFormat::Json => {
            let mut value = json!({
                "mutation_id": mutation.id.0,
                "kind": mutation.kind().as_str(),
                "resource": mutation.resource,
                "record_id": submission.record_id.as_str(),
                "status": outcome.as_str(),
            });
            if let Outcome::Failed(failure) = &outcome {
                value["error"] = json!(failure.reason.to_string());
            }
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => match &outcome {
            Outcome::Queued => println!(
                "Queued {} {}/{} ({}); it will sync when the remote is reachable",
                mutation.kind(),
                mutation.resource,
                submission.record_id,
                mutation.id
            ),
            Outcome::Synced => {
                println!("{} {}/{}", verb(mutation.kind()), mutation.resource, submission.record_id)
            }
            Outcome::Failed(_) => {}
        },
    }

    match outcome {
        Outcome::Failed(failure) => Err(Error::SyncFailed(failure.to_string())),
        Outcome::Queued | Outcome::Synced => Ok(()),
    }
}

#[cfg(test)]
#[path = "mutate_tests.rs"]
mod tests;
