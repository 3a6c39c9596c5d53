// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Rust specs for the `tally init` command.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use yare::parameterized;

fn tally() -> Command {
    let mut cmd = cargo_bin_cmd!("tally");
    cmd.env_remove("TALLY_DIR").env_remove("TALLY_LOG");
    cmd
}

#[test]
fn creates_tally_directory() {
    let temp = TempDir::new().unwrap();

    tally()
        .arg("init")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized tally"))
        .stdout(predicate::str::contains("Remote: none"));

    assert!(temp.path().join(".tally/config.toml").exists());
    let gitignore = std::fs::read_to_string(temp.path().join(".tally/.gitignore")).unwrap();
    assert!(gitignore.contains("queue.jsonl"));
    assert!(gitignore.contains("cache.db"));
}

#[test]
fn fails_if_already_initialized() {
    let temp = TempDir::new().unwrap();
    tally().arg("init").current_dir(temp.path()).assert().success();

    tally()
        .arg("init")
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn path_option_creates_at_location() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("nested/project");

    tally().args(["init", "--path"]).arg(&target).current_dir(temp.path()).assert().success();

    assert!(target.join(".tally/config.toml").exists());
    assert!(!temp.path().join(".tally").exists());
}

#[test]
fn remote_and_resource_are_saved() {
    let temp = TempDir::new().unwrap();

    tally()
        .args(["init", "--remote", "https://api.example.com/v1", "--token-env", "HABITS_TOKEN"])
        .args(["--resource", "habit"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Remote: https://api.example.com/v1"))
        .stdout(predicate::str::contains("Default resource: habit"));

    let config = std::fs::read_to_string(temp.path().join(".tally/config.toml")).unwrap();
    assert!(config.contains("default_resource = \"habit\""));
    assert!(config.contains("url = \"https://api.example.com/v1\""));
    assert!(config.contains("token_env = \"HABITS_TOKEN\""));
}

#[parameterized(
    no_scheme = { "api.example.com" },
    ftp = { "ftp://api.example.com" },
    no_host = { "https://" },
)]
fn invalid_remote_is_rejected(url: &str) {
    let temp = TempDir::new().unwrap();

    tally().args(["init", "--remote", url]).current_dir(temp.path()).assert().failure();

    assert!(!temp.path().join(".tally").exists());
}

#[test]
fn token_env_requires_remote() {
    let temp = TempDir::new().unwrap();

    tally().args(["init", "--token-env", "TOKEN"]).current_dir(temp.path()).assert().failure();
}

#[test]
fn commands_fail_before_init() {
    let temp = TempDir::new().unwrap();

    tally()
        .arg("pending")
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("tally init"));
}
