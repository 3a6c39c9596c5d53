// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use tally_core::{Page, Record};

use crate::cli::OutputFormat;
use crate::display::format_record_line;
use crate::error::Result;
use crate::fields::parse_params;

use super::Session;

pub async fn run(
    session: &Session,
    resource: Option<String>,
    params: &[String],
    output: OutputFormat,
) -> Result<()> {
    let page = run_impl(session, resource, params).await?;

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&page)?),
        OutputFormat::Id => {
            for record in &page.items {
                println!("{}", record.id);
            }
        }
        OutputFormat::Text => {
            if page.items.is_empty() {
                println!("No records");
            }
            for record in &page.items {
                println!("{}", format_record_line(record));
            }
            if let Some(cursor) = &page.next_cursor {
                println!("(more: -p cursor={})", cursor);
            }
        }
    }
    Ok(())
}

/// Internal implementation that returns the page for testing.
pub(crate) async fn run_impl(
    session: &Session,
    resource: Option<String>,
    params: &[String],
) -> Result<Page<Record>> {
    let resource = session.resource(resource)?;
    let params = parse_params(params)?;
    session.probe().await;
    Ok(session.engine.list(&resource, &params).await?)
}

#[cfg(test)]
#[path = "list_tests.rs"]
mod tests;
