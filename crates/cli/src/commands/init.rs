// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};

use crate::config::{init_work_dir, Config, RemoteConfig};
use crate::error::{Error, Result};

pub fn run(
    path: Option<String>,
    remote: Option<String>,
    token_env: Option<String>,
    resource: Option<String>,
) -> Result<()> {
    let target_path = match path {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir()?,
    };
    let work_dir = run_impl(&target_path, remote, token_env, resource)?;
    let config = Config::load(&work_dir)?;

    println!("Initialized tally at {}", work_dir.display());
    match config.remote_url() {
        Some(url) => println!("Remote: {}", url),
        None => println!("Remote: none (changes stay queued until one is configured)"),
    }
    if let Some(resource) = &config.default_resource {
        println!("Default resource: {}", resource);
    }
    Ok(())
}

/// Internal implementation that accepts the target path for testing.
pub(crate) fn run_impl(
    target_path: &Path,
    remote: Option<String>,
    token_env: Option<String>,
    resource: Option<String>,
) -> Result<PathBuf> {
    let remote = remote.map(|url| RemoteConfig { url: url.trim().to_string(), token_env });
    if let Some(msg) = remote.as_ref().and_then(RemoteConfig::validate_url) {
        return Err(Error::Config(msg));
    }

    let config = Config { remote, default_resource: resource, ..Config::default() };
    init_work_dir(target_path, &config)
}

#[cfg(test)]
#[path = "init_tests.rs"]
mod tests;
