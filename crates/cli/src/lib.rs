// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tallyrs - the library behind the `tally` CLI.
//!
//! `tally` records changes to remote resources while offline. Every change
//! applies locally at once, waits in a durable queue under `.tally/`, and is
//! replayed in order once the remote answers. Reads go through a TTL cache
//! so recently seen data stays available without a connection.
//!
//! # Main Components
//!
//! - [`Config`] - Remote URL, default resource and sync tuning (`.tally/config.toml`)
//! - [`commands`] - One module per subcommand, each over a [`commands::Session`]
//! - [`Error`] - Error types for all operations
//!
//! The sync machinery itself lives in `tally-sync`.

mod cli;
pub mod commands;
pub mod config;
mod display;
mod env;
pub mod error;
mod fields;
pub mod last_sync;
mod logging;

pub use cli::{Cli, Command, FieldArgs, OutputFormat, ResourceArgs};
pub use config::{find_work_dir, init_work_dir, Config, RemoteConfig};
pub use error::{Error, Result};

use commands::{open_session, Session};
use tokio_util::sync::CancellationToken;

/// Execute a parsed command line. This is the main entry point for library
/// users and provides a testable way to run commands without process execution.
pub fn run(cli: Cli) -> Result<()> {
    if let Some(dir) = &cli.directory {
        std::env::set_current_dir(dir)?;
    }

    match cli.command {
        Command::Init { path, remote, token_env, resource } => {
            commands::init::run(path, remote, token_env, resource)
        }
        command => {
            let session = open_session()?;
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
            runtime.block_on(dispatch(&session, command))
        }
    }
}

async fn dispatch(session: &Session, command: Command) -> Result<()> {
    match command {
        Command::Init { .. } => Err(Error::AlreadyInitialized(session.work_dir.display().to_string())),
        Command::Create { resource, fields, output } => {
            commands::mutate::create(session, resource, &fields.fields, output).await
        }
        Command::Update { id, fields, resource, output } => {
            commands::mutate::update(session, &id, resource.resource, &fields.fields, output).await
        }
        Command::Delete { id, resource } => {
            commands::mutate::delete(session, &id, resource.resource).await
        }
        Command::Log { id, event, data, at, resource } => {
            commands::mutate::log(
                session,
                &id,
                &event,
                data.as_deref(),
                at.as_deref(),
                resource.resource,
            )
            .await
        }
        Command::Show { id, resource, output } => {
            commands::show::run(session, &id, resource.resource, output).await
        }
        Command::List { resource, params, output } => {
            commands::list::run(session, resource, &params, output).await
        }
        Command::Pending { output } => commands::pending::run(session, output),
        Command::Status => commands::status::run(session).await,
        Command::Sync => commands::sync::run(session).await,
        Command::Watch { interval } => {
            let shutdown = CancellationToken::new();
            let on_signal = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_signal.cancel();
                }
            });
            commands::watch::run(session, interval, shutdown).await
        }
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
