// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline-first sync engine.
//!
//! Mutations are queued durably and applied optimistically to the local
//! cache; a scheduler drains the queue against the remote store whenever
//! connectivity allows.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Runner    │────►│   Engine    │────►│ RemoteStore │────►│  Transport  │
//! │ (scheduler) │     │  (facade)   │◄────│  (adapter)  │◄────│   (trait)   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!        ▲                   │
//!        │                   ▼
//! ┌─────────────┐     ┌─────────────┐
//! │Connectivity │     │ Queue+Cache │  (outbox-core, durable)
//! │   (probe)   │     │             │
//! └─────────────┘     └─────────────┘
//! ```
//!
//! # Features
//!
//! - Durable JSONL action queue replayed in enqueue order
//! - Optimistic cache patches with rebase after refresh
//! - Transient failures retried up to a bound, permanent ones dropped
//! - Reconnect debounce, periodic ticks and coalesced manual syncs
//! - Injectable transport and remote store for testing

mod connectivity;
mod engine;
mod notification;
mod processor;
mod remote;
mod runner;
mod transport;

pub use connectivity::{probe, spawn_probe, ConnectivityMonitor, Transition};
pub use engine::Engine;
pub use notification::Notification;
pub use processor::{
    CycleReport, DroppedAction, SyncGuard, SyncOutcome, SyncPolicy, SyncState, SyncStatus,
    Trigger, MAX_RETRIES,
};
pub use remote::{
    adapter_for, CollectionAdapter, ContactsAdapter, NotesAdapter, RemoteError, RemoteFuture,
    RemoteStore, TasksAdapter, WebSocketRemote,
};
pub use runner::{run, Runner, RunnerConfig, SyncHandle};
pub use transport::{Transport, TransportError, WebSocketTransport};

#[cfg(test)]
mod test_helpers;
