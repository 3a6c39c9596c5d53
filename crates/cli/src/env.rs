// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! The variable name constants are generated by `build.rs` and live in the
//! [`vars`] submodule.

use std::path::PathBuf;

/// Generated environment variable name constants.
pub mod vars {
    include!(concat!(env!("OUT_DIR"), "/env_vars.rs"));
}

/// Returns the `TALLY_LOG` filter directive if set and non-empty.
pub fn log_filter() -> Option<String> {
    std::env::var(vars::TALLY_LOG).ok().filter(|v| !v.trim().is_empty())
}

/// Returns the value of `TALLY_DIR` if set: a `.tally` directory used
/// instead of searching upward from the current directory.
pub fn work_dir_override() -> Option<PathBuf> {
    std::env::var(vars::TALLY_DIR).ok().filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Reads the bearer token from the named variable, `TALLY_TOKEN` when unnamed.
pub fn token(var_name: Option<&str>) -> Option<String> {
    std::env::var(var_name.unwrap_or(vars::TALLY_TOKEN)).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
