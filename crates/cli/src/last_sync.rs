// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Persists the time of the last flush that emptied the queue, so `status`
//! can report it across invocations.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::Result;

pub struct LastSync {
    path: PathBuf,
}

impl LastSync {
    pub const FILE_NAME: &'static str = "last_sync.txt";

    pub fn new(work_dir: &Path) -> Self {
        LastSync { path: work_dir.join(Self::FILE_NAME) }
    }

    /// Read the timestamp, returns None if the file doesn't exist or is invalid.
    pub fn read(&self) -> Option<DateTime<Utc>> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        DateTime::parse_from_rfc3339(content.trim()).ok().map(|t| t.with_timezone(&Utc))
    }

    /// Write the timestamp with fsync.
    pub fn write(&self, at: DateTime<Utc>) -> Result<()> {
        use std::io::Write;
        let mut file = std::fs::File::create(&self.path)?;
        write!(file, "{}", at.to_rfc3339())?;
        file.sync_all()?;
        Ok(())
    }

    /// Write only if `at` is later than the stored time.
    pub fn update(&self, at: DateTime<Utc>) -> Result<()> {
        match self.read() {
            Some(current) if current >= at => Ok(()),
            _ => self.write(at),
        }
    }
}

#[cfg(test)]
#[path = "last_sync_tests.rs"]
mod tests;
