// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use tally_core::{Record, RecordId};

use crate::cli::OutputFormat;
use crate::display::format_record_details;
use crate::error::{Error, Result};

use super::Session;

pub async fn run(
    session: &Session,
    id: &str,
    resource: Option<String>,
    output: OutputFormat,
) -> Result<()> {
    let record = run_impl(session, id, resource).await?;
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Id => println!("{}", record.id),
        OutputFormat::Text => {
            for line in format_record_details(&record) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

pub(crate) async fn run_impl(session: &Session, id: &str, resource: Option<String>) -> Result<Record> {
    let resource = session.resource(resource)?;
    let id = RecordId::new(id)?;
    session.probe().await;
    session.engine.record(&resource, &id).await?.ok_or_else(|| Error::RecordNotFound(id.to_string()))
}

#[cfg(test)]
#[path = "show_tests.rs"]
mod tests;
