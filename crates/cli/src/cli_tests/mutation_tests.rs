// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! CLI argument parsing tests for `create`, `update`, `delete` and `log`.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use super::*;
use clap::Parser;

fn parse(args: &[&str]) -> Command {
    Cli::try_parse_from(args).unwrap().command
}

#[test]
fn test_create_with_fields() {
    let Command::Create { resource, fields, output } =
        parse(&["tally", "create", "habit", "-f", "name=Read", "--field", "goal=3"])
    else {
        panic!("expected create");
    };
    assert_eq!(resource.as_deref(), Some("habit"));
    assert_eq!(fields.fields, vec!["name=Read", "goal=3"]);
    assert_eq!(output, OutputFormat::Text);
}

#[test]
fn test_create_without_resource_uses_default() {
    let Command::Create { resource, output, .. } =
        parse(&["tally", "create", "-f", "name=Read", "-o", "id"])
    else {
        panic!("expected create");
    };
    assert!(resource.is_none());
    assert_eq!(output, OutputFormat::Id);
}

#[test]
fn test_update_with_resource() {
    let Command::Update { id, fields, resource, .. } =
        parse(&["tally", "update", "srv-1", "-f", "goal=5", "-r", "habit"])
    else {
        panic!("expected update");
    };
    assert_eq!(id, "srv-1");
    assert_eq!(fields.fields, vec!["goal=5"]);
    assert_eq!(resource.resource.as_deref(), Some("habit"));
}

#[test]
fn test_update_requires_id() {
    assert!(Cli::try_parse_from(["tally", "update"]).is_err());
}

#[test]
fn test_delete() {
    assert_eq!(
        parse(&["tally", "delete", "srv-1"]),
        Command::Delete { id: "srv-1".to_string(), resource: ResourceArgs::default() }
    );
}

#[test]
fn test_log_with_data_and_time() {
    let command = parse(&[
        "tally",
        "log",
        "srv-1",
        "done",
        "--data",
        r#"{"minutes":20}"#,
        "--at",
        "2026-01-02T03:04:05Z",
    ]);
    let Command::Log { id, event, data, at, .. } = command else {
        panic!("expected log");
    };
    assert_eq!(id, "srv-1");
    assert_eq!(event, "done");
    assert_eq!(data.as_deref(), Some(r#"{"minutes":20}"#));
    assert_eq!(at.as_deref(), Some("2026-01-02T03:04:05Z"));
}

#[test]
fn test_log_rejects_empty_event() {
    assert!(Cli::try_parse_from(["tally", "log", "srv-1", ""]).is_err());
}
