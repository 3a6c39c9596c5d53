// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::cli::OutputFormat;
use crate::display::format_mutation_line;
use crate::error::Result;

use super::Session;

pub fn run(session: &Session, output: OutputFormat) -> Result<()> {
    let pending = session.engine.pending();

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&pending)?),
        OutputFormat::Id => {
            for mutation in &pending {
                println!("{}", mutation.id.0);
            }
        }
        OutputFormat::Text => {
            if pending.is_empty() {
                println!("No pending mutations");
            }
            for mutation in &pending {
                println!("{}", format_mutation_line(mutation));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "pending_tests.rs"]
mod tests;
