// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Rust specs for syncing against a live HTTP remote.
//!
//! A small blocking server answers `GET /health` and `POST /<resource>`,
//! one request per connection.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tally() -> Command {
    let mut cmd = cargo_bin_cmd!("tally");
    cmd.env_remove("TALLY_DIR").env_remove("TALLY_LOG");
    cmd
}

struct Remote {
    url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl Remote {
    /// Starts a server; mutations answer with `mutation_status`.
    fn start(mutation_status: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        thread::spawn(move || {
            let mut created = 0;
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let line = read_request_line(&mut stream);
                let (status, body) = if line.starts_with("GET /health") {
                    ("200 OK", "{}".to_string())
                } else if mutation_status.starts_with('2') {
                    created += 1;
                    (mutation_status, format!(r#"{{"id":"srv-{created}","fields":{{}}}}"#))
                } else {
                    (mutation_status, r#"{"error":"rejected"}"#.to_string())
                };
                seen.lock().unwrap().push(line);
                let response = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        Remote { url, requests }
    }

    fn mutations(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().filter(|l| !l.starts_with("GET /health")).cloned().collect()
    }
}

/// Reads one request and returns its request line.
fn read_request_line(stream: &mut TcpStream) -> String {
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = stream.read(&mut buf).unwrap_or(0);
        request.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&request).to_string();
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text
                .lines()
                .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().to_string()))
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(0);
            if request.len() >= end + 4 + length {
                return text.lines().next().unwrap_or_default().to_string();
            }
        }
        if n == 0 {
            return text.lines().next().unwrap_or_default().to_string();
        }
    }
}

fn init_with(remote: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    tally()
        .args(["init", "-r", "habit", "--remote", remote])
        .current_dir(temp.path())
        .assert()
        .success();
    temp
}

#[test]
fn create_syncs_immediately_when_online() {
    let remote = Remote::start("201 Created");
    let temp = init_with(&remote.url);

    tally()
        .args(["create", "-f", "name=Read", "-o", "id"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout("srv-1\n");

    assert_eq!(remote.mutations(), vec!["POST /habit HTTP/1.1"]);

    tally()
        .arg("status")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("connectivity: online"))
        .stdout(predicate::str::contains("pending: 0"))
        .stdout(predicate::str::contains("last sync: never").not());
}

#[test]
fn rejected_create_fails_and_leaves_nothing_queued() {
    let remote = Remote::start("422 Unprocessable Entity");
    let temp = init_with(&remote.url);

    tally()
        .args(["create", "-f", "name="])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("sync failed"));

    tally()
        .arg("pending")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No pending mutations"));
}

#[test]
fn unreachable_remote_queues_until_sync() {
    let closed = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        format!("http://{}", listener.local_addr().unwrap())
    };
    let temp = init_with(&closed);

    tally()
        .args(["create", "-f", "name=Read"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Queued"));

    tally()
        .arg("sync")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Remote unreachable; 1 mutation(s) pending"));
}
