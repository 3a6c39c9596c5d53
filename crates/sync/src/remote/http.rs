// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! REST implementation of [`RemoteClient`] over reqwest.
//!
//! | call           | request                         |
//! |----------------|---------------------------------|
//! | `create`       | `POST {base}/{resource}`        |
//! | `update`       | `PATCH {base}/records/{id}`     |
//! | `delete`       | `DELETE {base}/records/{id}`    |
//! | `append_event` | `POST {base}/records/{id}/events` |
//! | `list`         | `GET {base}/{resource}?params`  |
//! | `get`          | `GET {base}/records/{id}`       |

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tally_core::{EventDraft, Fields, ListParams, Page, RecordId, ServerEvent, ServerRecord};

use super::{RemoteClient, RemoteError, RemoteErrorKind, RemoteFuture, RemoteResult};
use crate::network::{Connectivity, ConnectivityProbe};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Error bodies are truncated to this many characters in messages.
const MAX_ERROR_BODY: usize = 200;

#[derive(Clone)]
pub struct HttpRemoteClient {
    client: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl HttpRemoteClient {
    /// Creates a client for the service rooted at `base_url`, sending `token` as a bearer token.
    pub fn new(base_url: &str, token: Option<String>) -> RemoteResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::new(RemoteErrorKind::Config, e.to_string()))?;
        Ok(HttpRemoteClient { client, base: parse_base(base_url)?, token })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub(crate) fn endpoint(&self, segments: &[&str]) -> RemoteResult<Url> {
        endpoint(&self.base, segments)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> RemoteResult<T> {
        let body = send(builder).await?;
        serde_json::from_slice(&body).map_err(|e| RemoteError::decode(e.to_string()))
    }
}

impl RemoteClient for HttpRemoteClient {
    fn create<'a>(&'a self, resource: &'a str, fields: &'a Fields) -> RemoteFuture<'a, ServerRecord> {
        Box::pin(async move {
            let url = self.endpoint(&[resource])?;
            let mut record: ServerRecord =
                self.send_json(self.request(Method::POST, url).json(fields)).await?;
            if record.resource.is_empty() {
                record.resource = resource.to_string();
            }
            Ok(record)
        })
    }

    fn update<'a>(&'a self, id: &'a RecordId, fields: &'a Fields) -> RemoteFuture<'a, ServerRecord> {
        Box::pin(async move {
            let url = self.endpoint(&["records", id.as_str()])?;
            self.send_json(self.request(Method::PATCH, url).json(fields)).await
        })
    }

    fn delete<'a>(&'a self, id: &'a RecordId) -> RemoteFuture<'a, ()> {
        Box::pin(async move {
            let url = self.endpoint(&["records", id.as_str()])?;
            send(self.request(Method::DELETE, url)).await.map(|_| ())
        })
    }

    fn append_event<'a>(
        &'a self,
        id: &'a RecordId,
        event: &'a EventDraft,
    ) -> RemoteFuture<'a, ServerEvent> {
        Box::pin(async move {
            let url = self.endpoint(&["records", id.as_str(), "events"])?;
            self.send_json(self.request(Method::POST, url).json(event)).await
        })
    }

    fn list<'a>(
        &'a self,
        resource: &'a str,
        params: &'a ListParams,
    ) -> RemoteFuture<'a, Page<ServerRecord>> {
        Box::pin(async move {
            let mut url = self.endpoint(&[resource])?;
            if !params.is_empty() {
                url.query_pairs_mut().extend_pairs(params.iter());
            }
            let mut page: Page<ServerRecord> =
                self.send_json(self.request(Method::GET, url)).await?;
            for record in page.items.iter_mut().filter(|r| r.resource.is_empty()) {
                record.resource = resource.to_string();
            }
            Ok(page)
        })
    }

    fn get<'a>(&'a self, id: &'a RecordId) -> RemoteFuture<'a, ServerRecord> {
        Box::pin(async move {
            let url = self.endpoint(&["records", id.as_str()])?;
            self.send_json(self.request(Method::GET, url)).await
        })
    }
}

/// Reachability check against `GET {base}/health`.
pub struct HttpProbe {
    client: reqwest::Client,
    url: Url,
}

impl HttpProbe {
    pub fn new(base_url: &str) -> RemoteResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::new(RemoteErrorKind::Config, e.to_string()))?;
        let url = endpoint(&parse_base(base_url)?, &["health"])?;
        Ok(HttpProbe { client, url })
    }
}

impl ConnectivityProbe for HttpProbe {
    fn probe(&self) -> Pin<Box<dyn Future<Output = Connectivity> + Send + '_>> {
        Box::pin(async move {
            match self.client.get(self.url.clone()).send().await {
                Ok(response) if response.status().is_success() => Connectivity::Online,
                Ok(response) => {
                    tracing::debug!(status = %response.status(), "health check failed");
                    Connectivity::Offline
                }
                Err(e) => {
                    tracing::debug!(error = %e, "health check unreachable");
                    Connectivity::Offline
                }
            }
        })
    }
}

fn parse_base(base_url: &str) -> RemoteResult<Url> {
    let base = Url::parse(base_url)
        .map_err(|e| RemoteError::new(RemoteErrorKind::Config, format!("{base_url}: {e}")))?;
    if base.cannot_be_a_base() {
        return Err(RemoteError::new(RemoteErrorKind::Config, format!("{base_url}: not a base URL")));
    }
    Ok(base)
}

/// Appends percent-encoded path segments to `base`.
fn endpoint(base: &Url, segments: &[&str]) -> RemoteResult<Url> {
    let mut url = base.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|()| RemoteError::new(RemoteErrorKind::Config, "not a base URL"))?;
        path.pop_if_empty().extend(segments);
    }
    Ok(url)
}

async fn send(builder: RequestBuilder) -> RemoteResult<Vec<u8>> {
    let response = builder.send().await.map_err(from_reqwest)?;
    let status = response.status();
    let body = response.bytes().await.map_err(from_reqwest)?;
    if !status.is_success() {
        let text = String::from_utf8_lossy(&body);
        let message: String = text.chars().take(MAX_ERROR_BODY).collect();
        return Err(RemoteError::status(status.as_u16(), message));
    }
    Ok(body.to_vec())
}

fn from_reqwest(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::new(RemoteErrorKind::Timeout, e.to_string())
    } else if let Some(status) = e.status() {
        RemoteError::status(status.as_u16(), e.to_string())
    } else if e.is_decode() {
        RemoteError::decode(e.to_string())
    } else {
        RemoteError::connectivity(e.to_string())
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
