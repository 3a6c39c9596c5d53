// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Project configuration management.
//!
//! Configuration is stored in `.tally/config.toml` and includes:
//! - `[remote]`: base URL of the record service and the variable holding its token
//! - `default_resource`: resource used when a command is given none
//! - `[sync]`: engine tunables (retries, backoff, timeouts, cache TTLs)
//!
//! The same directory holds the engine state: the mutation queue, the
//! response cache, the log file and the last sync time.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use tally_sync::SyncConfig;

use crate::error::{Error, Result};

const WORK_DIR_NAME: &str = ".tally";
const CONFIG_FILE_NAME: &str = "config.toml";
const CACHE_FILE_NAME: &str = "cache.db";
const LOG_FILE_NAME: &str = "tally.log";
const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Project configuration stored in `.tally/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_resource: Option<String>,
    /// Remote service (optional - if absent, mutations stay queued locally).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Remote service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL, e.g. `https://api.example.com/v1`.
    pub url: String,
    /// Environment variable holding the bearer token (default: `TALLY_TOKEN`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,
}

impl RemoteConfig {
    /// Returns an error message if the URL is not http(s).
    pub fn validate_url(&self) -> Option<String> {
        let url = self.url.trim();
        let rest = url.strip_prefix("https://").or_else(|| url.strip_prefix("http://"));
        match rest {
            Some(host) if !host.is_empty() => None,
            Some(_) => Some(format!("invalid remote URL '{}': missing host", self.url)),
            None => Some(format!("invalid remote URL '{}': must start with http:// or https://", self.url)),
        }
    }

    pub fn token(&self) -> Option<String> {
        crate::env::token(self.token_env.as_deref())
    }
}

impl Config {
    /// Loads configuration from the given `.tally/` directory.
    pub fn load(work_dir: &Path) -> Result<Self> {
        let config_path = work_dir.join(CONFIG_FILE_NAME);
        let content = fs::read_to_string(&config_path)
            .map_err(|e| Error::Config(format!("failed to read config: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        if let Some(msg) = config.remote.as_ref().and_then(RemoteConfig::validate_url) {
            return Err(Error::Config(msg));
        }
        Ok(config)
    }

    /// Saves configuration to the given `.tally/` directory.
    pub fn save(&self, work_dir: &Path) -> Result<()> {
        let config_path = work_dir.join(CONFIG_FILE_NAME);
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn remote_url(&self) -> Option<&str> {
        self.remote.as_ref().map(|r| r.url.as_str())
    }

    /// Picks the explicit resource, falling back to `default_resource`.
    pub fn resource(&self, explicit: Option<String>) -> Result<String> {
        explicit
            .or_else(|| self.default_resource.clone())
            .filter(|r| !r.trim().is_empty())
            .ok_or(Error::NoResource)
    }
}

/// Find the .tally directory: `TALLY_DIR` if set, otherwise by walking up
/// from the current directory.
pub fn find_work_dir() -> Result<PathBuf> {
    if let Some(dir) = crate::env::work_dir_override() {
        return if dir.is_dir() { Ok(dir) } else { Err(Error::NotInitialized) };
    }
    let mut current = std::env::current_dir()?;
    loop {
        let work_dir = current.join(WORK_DIR_NAME);
        if work_dir.is_dir() {
            return Ok(work_dir);
        }
        if !current.pop() {
            return Err(Error::NotInitialized);
        }
    }
}

pub fn cache_path(work_dir: &Path) -> PathBuf {
    work_dir.join(CACHE_FILE_NAME)
}

pub fn log_path(work_dir: &Path) -> PathBuf {
    work_dir.join(LOG_FILE_NAME)
}

/// Initialize a new .tally directory at the given path.
pub fn init_work_dir(path: &Path, config: &Config) -> Result<PathBuf> {
    let work_dir = path.join(WORK_DIR_NAME);

    if work_dir.exists() {
        return Err(Error::AlreadyInitialized(work_dir.display().to_string()));
    }

    fs::create_dir_all(&work_dir)?;
    config.save(&work_dir)?;
    write_gitignore(&work_dir)?;

    Ok(work_dir)
}

/// Write a .gitignore that keeps runtime state out of version control.
pub fn write_gitignore(work_dir: &Path) -> Result<()> {
    let content = "# Pending mutations\nqueue.jsonl\nqueue.seq\nqueue.lock\n\n\
                   # Response cache\ncache.db*\n\n# Runtime state\ntally.log\nlast_sync.txt\n";
    fs::write(work_dir.join(GITIGNORE_FILE_NAME), content)?;
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
