// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serves one canned HTTP response and returns the raw request it received.
async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let response = format!(
        "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text
                    .lines()
                    .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().to_string()))
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(0);
                if request.len() >= end + 4 + length {
                    break;
                }
            }
            if n == 0 {
                break;
            }
        }
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&request).to_string()
    });

    (base, handle)
}

fn fields(value: serde_json::Value) -> Fields {
    value.as_object().cloned().unwrap()
}

#[test]
fn endpoint_encodes_segments() {
    let client = HttpRemoteClient::new("https://api.example.com/v1/", None).unwrap();
    let url = client.endpoint(&["records", "a b", "events"]).unwrap();
    assert_eq!(url.as_str(), "https://api.example.com/v1/records/a%20b/events");
}

#[test]
fn endpoint_without_trailing_slash() {
    let client = HttpRemoteClient::new("https://api.example.com/v1", None).unwrap();
    let url = client.endpoint(&["habit"]).unwrap();
    assert_eq!(url.as_str(), "https://api.example.com/v1/habit");
}

#[test]
fn invalid_base_url_is_config_error() {
    let err = HttpRemoteClient::new("not a url", None).err().unwrap();
    assert_eq!(err.kind, RemoteErrorKind::Config);
    let err = HttpRemoteClient::new("mailto:someone@example.com", None).err().unwrap();
    assert_eq!(err.kind, RemoteErrorKind::Config);
}

#[tokio::test]
async fn create_posts_fields_and_fills_resource() {
    let (base, server) = serve_once("201 Created", r#"{"id":"srv-1","fields":{"name":"Read"}}"#).await;
    let client = HttpRemoteClient::new(&base, Some("secret".to_string())).unwrap();

    let record = client.create("habit", &fields(json!({"name": "Read"}))).await.unwrap();
    assert_eq!(record.id.as_str(), "srv-1");
    assert_eq!(record.resource, "habit");

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /habit HTTP/1.1"));
    assert!(request.to_ascii_lowercase().contains("authorization: bearer secret"));
    assert!(request.ends_with(r#"{"name":"Read"}"#));
}

#[tokio::test]
async fn list_sends_params_as_query() {
    let (base, server) = serve_once("200 OK", r#"{"items":[{"id":"srv-1"}],"next_cursor":null}"#).await;
    let client = HttpRemoteClient::new(&base, None).unwrap();

    let params = ListParams::new().with("status", "active").with("page", "2");
    let page = client.list("habit", &params).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].resource, "habit");

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /habit?page=2&status=active HTTP/1.1"));
    assert!(!request.to_ascii_lowercase().contains("authorization"));
}

#[tokio::test]
async fn delete_accepts_empty_body() {
    let (base, server) = serve_once("204 No Content", "").await;
    let client = HttpRemoteClient::new(&base, None).unwrap();
    client.delete(&RecordId::new("srv-1").unwrap()).await.unwrap();
    assert!(server.await.unwrap().starts_with("DELETE /records/srv-1 HTTP/1.1"));
}

#[tokio::test]
async fn error_status_maps_to_status_kind() {
    let (base, _server) = serve_once("409 Conflict", r#"{"error":"stale"}"#).await;
    let client = HttpRemoteClient::new(&base, None).unwrap();
    let err = client
        .update(&RecordId::new("x").unwrap(), &fields(json!({"name": "Y"})))
        .await
        .unwrap_err();
    assert_eq!(err.kind, RemoteErrorKind::Status(409));
    assert!(err.message.contains("stale"));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn malformed_body_is_decode_error() {
    let (base, _server) = serve_once("200 OK", "not json").await;
    let client = HttpRemoteClient::new(&base, None).unwrap();
    let err = client.get(&RecordId::new("x").unwrap()).await.unwrap_err();
    assert_eq!(err.kind, RemoteErrorKind::Decode);
}

#[tokio::test]
async fn unreachable_host_is_connectivity_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = HttpRemoteClient::new(&base, None).unwrap();
    let err = client.get(&RecordId::new("x").unwrap()).await.unwrap_err();
    assert!(err.is_connectivity());
    assert!(err.is_transient());
}

#[tokio::test]
async fn probe_reports_health() {
    let (base, server) = serve_once("200 OK", "{}").await;
    let probe = HttpProbe::new(&base).unwrap();
    assert_eq!(probe.probe().await, Connectivity::Online);
    assert!(server.await.unwrap().starts_with("GET /health HTTP/1.1"));

    let (base, _server) = serve_once("503 Service Unavailable", "{}").await;
    let probe = HttpProbe::new(&base).unwrap();
    assert_eq!(probe.probe().await, Connectivity::Offline);
}
