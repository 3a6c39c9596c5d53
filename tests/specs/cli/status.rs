// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Rust specs for `tally status` and `tally sync` without a remote.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tally() -> Command {
    let mut cmd = cargo_bin_cmd!("tally");
    cmd.env_remove("TALLY_DIR").env_remove("TALLY_LOG");
    cmd
}

fn init_temp() -> TempDir {
    let temp = TempDir::new().unwrap();
    tally().args(["init", "-r", "habit"]).current_dir(temp.path()).assert().success();
    temp
}

#[test]
fn status_of_fresh_directory() {
    let temp = init_temp();

    tally()
        .arg("status")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("remote: none"))
        .stdout(predicate::str::contains("connectivity: offline"))
        .stdout(predicate::str::contains("pending: 0"))
        .stdout(predicate::str::contains("last sync: never"));
}

#[test]
fn status_counts_pending() {
    let temp = init_temp();
    tally().args(["create", "-f", "name=Read"]).current_dir(temp.path()).assert().success();
    tally().args(["create", "-f", "name=Run"]).current_dir(temp.path()).assert().success();

    tally()
        .arg("status")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("pending: 2"));
}

#[test]
fn sync_without_remote_keeps_queue() {
    let temp = init_temp();
    tally().args(["create", "-f", "name=Read"]).current_dir(temp.path()).assert().success();

    tally()
        .arg("sync")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No remote configured; 1 mutation(s) pending"));
}

#[test]
fn directory_flag_and_env_override() {
    let temp = init_temp();
    let elsewhere = TempDir::new().unwrap();

    tally()
        .arg("-C")
        .arg(temp.path())
        .arg("status")
        .current_dir(elsewhere.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("pending: 0"));

    tally()
        .arg("status")
        .env("TALLY_DIR", temp.path().join(".tally"))
        .current_dir(elsewhere.path())
        .assert()
        .success();
}
