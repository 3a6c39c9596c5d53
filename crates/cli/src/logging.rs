// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Log setup: `TALLY_LOG` filter directives, appended to `.tally/tally.log`.

use std::fs;
use std::path::Path;

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn";

/// Builds the filter from `TALLY_LOG`, defaulting to warnings only.
pub fn filter() -> EnvFilter {
    crate::env::log_filter()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber, writing to `log_path` or stderr when the
/// file cannot be opened. Later calls are no-ops.
pub fn setup(log_path: &Path) {
    let filter = filter();

    // Try to open log file, fall back to stderr
    let installed = if let Ok(file) = fs::OpenOptions::new().create(true).append(true).open(log_path)
    {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(file)
            .with_ansi(false)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init()
    };
    if installed.is_err() {
        tracing::debug!("log subscriber already installed");
    }
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
