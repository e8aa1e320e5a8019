// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! outbox-core: Shared library for the outbox sync engine
//!
//! This crate provides the data model, durable action queue, local snapshot
//! cache and wire protocol used by both the outbox client and the reference
//! remote store.

pub mod action;
pub mod cache;
pub mod clock;
pub mod entity;
pub mod error;
pub mod jsonl;
pub mod patch;
pub mod protocol;
pub mod queue;
pub mod storage;

pub use action::{ActionId, PendingAction};
pub use cache::{Snapshot, SnapshotCache};
pub use clock::{ClockSource, Stamp, StampClock, SystemClock};
pub use entity::{EntityType, Operation, Record};
pub use error::{Error, Result};
pub use protocol::{ClientMessage, FailureKind, ServerMessage};
pub use queue::ActionQueue;
pub use storage::{FileStorage, MemoryStorage, Storage, CACHE_KEY, QUEUE_KEY};
