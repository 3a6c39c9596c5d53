// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Rust specs for mutation commands without a reachable remote: every change
//! applies locally and waits in the queue.

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
    tally()
        .args(["init", "--resource", "habit"])
        .current_dir(temp.path())
        .assert()
        .success();
    temp
}

fn create(temp: &TempDir, fields: &[&str]) -> String {
    let mut cmd = tally();
    cmd.args(["create", "-o", "id"]);
    for field in fields {
        cmd.args(["-f", field]);
    }
    let output = cmd.current_dir(temp.path()).output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

#[test]
fn create_queues_with_temp_id() {
    let temp = init_temp();

    let id = create(&temp, &["name=Read", "goal=3"]);
    assert!(id.starts_with("temp-"), "{id}");

    tally()
        .arg("pending")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains(&id));
}

#[test]
fn create_text_output_says_queued() {
    let temp = init_temp();

    tally()
        .args(["create", "-f", "name=Read"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Queued"));
}

#[test]
fn show_reads_pending_record_in_new_process() {
    let temp = init_temp();
    let id = create(&temp, &["name=Read", "goal=3"]);

    tally()
        .args(["show", &id])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Read"))
        .stdout(predicate::str::contains("pending"));

    let output = tally().args(["show", &id, "-o", "json"]).current_dir(temp.path()).output().unwrap();
    let record: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(record["fields"]["goal"], 3);
}

#[test]
fn update_of_temp_record_merges_fields() {
    let temp = init_temp();
    let id = create(&temp, &["name=Read", "goal=3"]);

    tally().args(["update", &id, "-f", "goal=5"]).current_dir(temp.path()).assert().success();

    let output = tally().args(["show", &id, "-o", "json"]).current_dir(temp.path()).output().unwrap();
    let record: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(record["fields"]["goal"], 5);
    assert_eq!(record["fields"]["name"], "Read");
}

#[test]
fn log_and_delete_are_queued_in_order() {
    let temp = init_temp();
    let id = create(&temp, &["name=Read"]);

    tally()
        .args(["log", &id, "done", "--data", "{\"minutes\": 20}"])
        .current_dir(temp.path())
        .assert()
        .success();
    tally().args(["delete", &id]).current_dir(temp.path()).assert().success();

    let output = tally().args(["pending", "-o", "json"]).current_dir(temp.path()).output().unwrap();
    let pending: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let pending = pending.as_array().unwrap();
    assert_eq!(pending.len(), 3);
    let ids: Vec<u64> = pending.iter().map(|m| m["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    tally()
        .args(["show", &id])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("record not found"));
}

#[test]
fn invalid_field_is_rejected() {
    let temp = init_temp();

    tally()
        .args(["create", "-f", "no-equals-sign"])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid field"));

    tally()
        .arg("pending")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No pending mutations"));
}

#[test]
fn invalid_timestamp_is_rejected() {
    let temp = init_temp();
    let id = create(&temp, &["name=Read"]);

    tally()
        .args(["log", &id, "done", "--at", "yesterday"])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid timestamp"));
}

#[test]
fn list_offline_without_cache_fails() {
    let temp = init_temp();

    tally()
        .arg("list")
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("offline"));
}

#[test]
fn create_without_resource_fails() {
    let temp = TempDir::new().unwrap();
    tally().arg("init").current_dir(temp.path()).assert().success();

    tally()
        .args(["create", "-f", "name=Read"])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no resource given"));
}
