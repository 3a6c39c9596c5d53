// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote service client abstraction.
//!
//! The engine talks to the server only through [`RemoteClient`], so tests can
//! script responses and hosts can plug in their own transport.

mod http;

pub use http::{HttpProbe, HttpRemoteClient};

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tally_core::{EventDraft, Fields, ListParams, Page, RecordId, ServerEvent, ServerRecord};

/// Boxed future returned by [`RemoteClient`] methods.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = RemoteResult<T>> + Send + 'a>>;

/// Result type for remote calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Whether a failed call is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Transient,
    Permanent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// The per-attempt deadline passed.
    Timeout,
    /// The service could not be reached.
    Connectivity,
    /// The service answered with a non-success HTTP status.
    Status(u16),
    /// The response body did not have the expected shape.
    Decode,
    /// The client itself is misconfigured (bad base URL, TLS setup).
    Config,
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteErrorKind::Timeout => f.write_str("timeout"),
            RemoteErrorKind::Connectivity => f.write_str("connectivity error"),
            RemoteErrorKind::Status(code) => write!(f, "HTTP {code}"),
            RemoteErrorKind::Decode => f.write_str("decode error"),
            RemoteErrorKind::Config => f.write_str("client configuration error"),
        }
    }
}

/// A failed remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        RemoteError { kind, message: message.into() }
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(RemoteErrorKind::Timeout, format!("no response after {}s", after.as_secs_f64()))
    }

    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Connectivity, message)
    }

    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Status(code), message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Decode, message)
    }

    /// HTTP-style classification: 408, 429, 5xx, timeouts and connectivity
    /// failures are transient; everything else is a rejection.
    pub fn classify(&self) -> FailureClass {
        match self.kind {
            RemoteErrorKind::Timeout | RemoteErrorKind::Connectivity => FailureClass::Transient,
            RemoteErrorKind::Status(408 | 429) => FailureClass::Transient,
            RemoteErrorKind::Status(code) if (500..600).contains(&code) => FailureClass::Transient,
            RemoteErrorKind::Status(_) | RemoteErrorKind::Decode | RemoteErrorKind::Config => {
                FailureClass::Permanent
            }
        }
    }

    pub fn is_transient(&self) -> bool {
        self.classify() == FailureClass::Transient
    }

    /// The remote was unreachable, which also means the client is offline.
    pub fn is_connectivity(&self) -> bool {
        self.kind == RemoteErrorKind::Connectivity
    }
}

/// Calls to the remote service.
///
/// Implementations must not retry internally; retry policy belongs to the engine.
pub trait RemoteClient: Send + Sync {
    fn create<'a>(&'a self, resource: &'a str, fields: &'a Fields) -> RemoteFuture<'a, ServerRecord>;

    fn update<'a>(&'a self, id: &'a RecordId, fields: &'a Fields) -> RemoteFuture<'a, ServerRecord>;

    fn delete<'a>(&'a self, id: &'a RecordId) -> RemoteFuture<'a, ()>;

    fn append_event<'a>(
        &'a self,
        id: &'a RecordId,
        event: &'a EventDraft,
    ) -> RemoteFuture<'a, ServerEvent>;

    fn list<'a>(
        &'a self,
        resource: &'a str,
        params: &'a ListParams,
    ) -> RemoteFuture<'a, Page<ServerRecord>>;

    /// Fetch a single record, used for read-through of record views.
    fn get<'a>(&'a self, id: &'a RecordId) -> RemoteFuture<'a, ServerRecord>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
