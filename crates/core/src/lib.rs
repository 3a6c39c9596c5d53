// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tally-core: Shared data model for the tally sync engine
//!
//! This crate provides the plain data types (ids, mutations, records, cache
//! keys) and small primitives (clock, JSONL files) used by both the sync
//! engine and the `tally` CLI.

pub mod cache_key;
pub mod clock;
pub mod error;
pub mod id;
pub mod jsonl;
pub mod mutation;
pub mod record;

pub use cache_key::{CacheKey, CacheScope};
pub use clock::{ClockSource, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use id::{MutationId, RecordId};
pub use mutation::{
    EventDraft, Fields, MutationKind, MutationPayload, MutationRequest, QueuedMutation,
};
pub use record::{ListParams, Page, Record, ServerEvent, ServerRecord};
