// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL (JSON Lines) file utilities.
//!
//! Provides durable append-only storage for JSON-serializable records.
//! Each record is stored as a single JSON line with fsync for durability.
//! Whole-file rewrites go through a sibling temp file and a rename, so readers
//! see either the old or the new content.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

/// Appends a record to a JSONL file with fsync for durability.
pub fn append<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    let json = serde_json::to_string(record)?;
    writeln!(file, "{json}")?;
    file.sync_all()?;

    Ok(())
}

/// Reads all records from a JSONL file.
///
/// Skips empty lines and returns an empty vec if the file doesn't exist.
/// A final line without a trailing newline that fails to parse is a torn
/// append from a crash and is ignored.
pub fn read_all<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let torn_tail = !content.is_empty() && !content.ends_with('\n');
    let lines: Vec<&str> = content.lines().collect();
    let mut records = Vec::with_capacity(lines.len());

    for (index, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(record) => records.push(record),
            Err(_) if torn_tail && index + 1 == lines.len() => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(records)
}

/// Writes all records to a JSONL file, replacing existing content atomically.
///
/// Used for rewriting files after partial consumption (e.g., queue drain).
pub fn write_all<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let mut buf = String::new();
    for record in records {
        buf.push_str(&serde_json::to_string(record)?);
        buf.push('\n');
    }
    write_atomic(path, buf.as_bytes())
}

/// Replaces `path` with `contents` via a fsynced temp file and rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp = tmp_path(path);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;

    // Persist the rename itself; not all platforms allow opening directories.
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
#[path = "jsonl_tests.rs"]
mod tests;
