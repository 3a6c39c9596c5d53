// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

mod args;

use clap::{Parser, Subcommand, ValueEnum};

pub use args::{FieldArgs, ResourceArgs};

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Id,
}

#[derive(Parser)]
#[command(name = "tally")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Offline-first record tracker: changes apply locally and sync when the remote is reachable")]
pub struct Cli {
    /// Run as if tally was started in <path>
    #[arg(short = 'C', long = "directory", global = true, value_name = "path")]
    pub directory: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Initialize a .tally directory
    Init {
        /// Directory to initialize (default: current directory)
        #[arg(long)]
        path: Option<String>,

        /// Base URL of the record service
        #[arg(long)]
        remote: Option<String>,

        /// Environment variable holding the service token
        #[arg(long, value_name = "VAR", requires = "remote")]
        token_env: Option<String>,

        /// Resource used when a command is given none
        #[arg(long, short = 'r', value_parser = non_empty_string)]
        resource: Option<String>,
    },

    /// Create a record
    #[command(after_help = "\
Examples:
  tally create habit -f name=Read -f goal=3   Create a habit
  tally create -f name=Read -o id             Use the default resource, print only the id")]
    Create {
        /// Resource type (default: default_resource from config)
        #[arg(value_parser = non_empty_string)]
        resource: Option<String>,

        #[command(flatten)]
        fields: FieldArgs,

        /// Output format (text, json, id)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Change fields of a record
    #[command(arg_required_else_help = true)]
    Update {
        /// Record id (server id or temp id)
        #[arg(value_parser = non_empty_string)]
        id: String,

        #[command(flatten)]
        fields: FieldArgs,

        #[command(flatten)]
        resource: ResourceArgs,

        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Delete a record
    #[command(arg_required_else_help = true)]
    Delete {
        #[arg(value_parser = non_empty_string)]
        id: String,

        #[command(flatten)]
        resource: ResourceArgs,
    },

    /// Log an event against a record
    #[command(arg_required_else_help = true)]
    #[command(after_help = "\
Examples:
  tally log srv-12 done                           Log a completion now
  tally log srv-12 done --data '{\"minutes\": 20}'  Attach data to the event")]
    Log {
        #[arg(value_parser = non_empty_string)]
        id: String,

        /// Event name
        #[arg(value_parser = non_empty_string)]
        event: String,

        /// Event data as JSON
        #[arg(long)]
        data: Option<String>,

        /// When it happened (RFC 3339, default: now)
        #[arg(long)]
        at: Option<String>,

        #[command(flatten)]
        resource: ResourceArgs,
    },

    /// Show one record
    #[command(arg_required_else_help = true)]
    Show {
        #[arg(value_parser = non_empty_string)]
        id: String,

        #[command(flatten)]
        resource: ResourceArgs,

        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// List records through the cache
    List {
        #[arg(value_parser = non_empty_string)]
        resource: Option<String>,

        /// Query parameter passed to the service (repeatable)
        #[arg(long = "param", short = 'p', value_name = "KEY=VALUE")]
        params: Vec<String>,

        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Show mutations waiting to be synced
    Pending {
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Show connectivity, queue length and last sync time
    Status,

    /// Replay pending mutations now
    Sync,

    /// Stay running: sync on reconnect and print engine events
    Watch {
        /// Seconds between connectivity probes (default: probe_interval_secs from config)
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },
}

#[cfg(test)]
#[path = "../cli_tests/mod.rs"]
mod tests;
