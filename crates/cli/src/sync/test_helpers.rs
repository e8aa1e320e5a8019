// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use outbox_core::patch::{self, Collection};
use outbox_core::{
    ActionId, ClockSource, EntityType, MemoryStorage, Operation, PendingAction, Record, Stamp,
};
use serde_json::{json, Value};
use tokio::sync::Notify;

use super::engine::Engine;
use super::processor::SyncPolicy;
use super::remote::{RemoteError, RemoteFuture, RemoteStore};

/// Builds a record from a JSON object literal.
pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

/// A note payload with the given id and title.
pub fn note(id: &str, title: &str) -> Record {
    record(json!({ "id": id, "title": title }))
}

/// A queued action as the processor would hand it to a remote.
pub fn pending(entity_type: EntityType, operation: Operation, payload: Record) -> PendingAction {
    PendingAction::new(entity_type, operation, payload, Stamp::new(1_000, 0))
}

/// Clock that advances one millisecond per reading.
#[derive(Debug)]
pub struct StepClock(AtomicU64);

impl StepClock {
    pub fn starting_at(ms: u64) -> Arc<dyn ClockSource> {
        Arc::new(StepClock(AtomicU64::new(ms)))
    }
}

impl ClockSource for StepClock {
    fn now_ms(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

/// One recorded `apply` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyCall {
    pub action_id: ActionId,
    pub entity_type: EntityType,
    pub operation: Operation,
    pub entity_id: String,
}

#[derive(Default)]
struct MockState {
    collections: BTreeMap<EntityType, Collection>,
    /// Results handed out to successive apply calls before falling back
    /// to applying against `collections`.
    scripted: VecDeque<Result<(), RemoteError>>,
    fetch_error: Option<RemoteError>,
    applies: Vec<ApplyCall>,
    fetches: Vec<(EntityType, Option<String>)>,
    gate: Option<Arc<Notify>>,
    closed: bool,
}

/// In-memory remote store with scripted failures.
///
/// Clones share state, so a test can keep one to inspect calls after
/// handing the other to an engine.
#[derive(Clone, Default)]
pub struct MockRemote {
    state: Arc<Mutex<MockState>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues results for the next apply calls, in order.
    pub fn script(&self, results: impl IntoIterator<Item = Result<(), RemoteError>>) {
        self.state.lock().unwrap().scripted.extend(results);
    }

    /// Makes every fetch fail with `error` (or succeed again with `None`).
    pub fn set_fetch_error(&self, error: Option<RemoteError>) {
        self.state.lock().unwrap().fetch_error = error;
    }

    /// Seeds a canonical record.
    pub fn seed(&self, entity_type: EntityType, payload: Record) {
        let mut state = self.state.lock().unwrap();
        patch::apply(
            state.collections.entry(entity_type).or_default(),
            Operation::Insert,
            &payload,
        );
    }

    /// Returns the canonical records of one entity type.
    pub fn records(&self, entity_type: EntityType) -> Vec<Record> {
        self.state
            .lock()
            .unwrap()
            .collections
            .get(&entity_type)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns every apply call so far.
    pub fn applies(&self) -> Vec<ApplyCall> {
        self.state.lock().unwrap().applies.clone()
    }

    /// Returns the entity ids of every apply call so far.
    pub fn applied_ids(&self) -> Vec<String> {
        self.applies().into_iter().map(|c| c.entity_id).collect()
    }

    /// Returns every fetch call so far.
    pub fn fetches(&self) -> Vec<(EntityType, Option<String>)> {
        self.state.lock().unwrap().fetches.clone()
    }

    /// Makes apply calls wait for a permit from the returned gate.
    pub fn gate(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().unwrap().gate = Some(Arc::clone(&gate));
        gate
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

impl RemoteStore for MockRemote {
    fn apply<'a>(&'a mut self, action: &'a PendingAction) -> RemoteFuture<'a, ()> {
        let state = Arc::clone(&self.state);
        let (entity_type, operation) = (action.entity_type, action.operation);
        let payload = action.payload.clone();
        let action_id = action.id.clone();
        Box::pin(async move {
            let gate = state.lock().unwrap().gate.clone();
            if let Some(gate) = gate {
                gate.notified().await;
            }

            let mut state = state.lock().unwrap();
            state.applies.push(ApplyCall {
                action_id,
                entity_type,
                operation,
                entity_id: outbox_core::entity::entity_id(&payload)
                    .unwrap_or_default()
                    .to_string(),
            });
            if let Some(result) = state.scripted.pop_front() {
                if result.is_err() {
                    return result;
                }
            }
            patch::apply(
                state.collections.entry(entity_type).or_default(),
                operation,
                &payload,
            );
            Ok(())
        })
    }

    fn fetch_all(
        &mut self,
        entity_type: EntityType,
        scope: Option<String>,
    ) -> RemoteFuture<'_, Vec<Record>> {
        let state = Arc::clone(&self.state);
        Box::pin(async move {
            let mut state = state.lock().unwrap();
            state.fetches.push((entity_type, scope.clone()));
            if let Some(e) = state.fetch_error.clone() {
                return Err(e);
            }
            let records = state
                .collections
                .get(&entity_type)
                .map(|c| c.values().cloned().collect::<Vec<_>>())
                .unwrap_or_default();
            Ok(match scope {
                Some(scope) => records
                    .into_iter()
                    .filter(|r| r.get("owner_id").and_then(Value::as_str) == Some(scope.as_str()))
                    .collect(),
                None => records,
            })
        })
    }

    fn close(&mut self) -> RemoteFuture<'_, ()> {
        let state = Arc::clone(&self.state);
        Box::pin(async move {
            state.lock().unwrap().closed = true;
            Ok(())
        })
    }
}

/// Engine type used throughout the sync tests.
pub type TestEngine = Engine<Arc<MemoryStorage>, MockRemote>;

/// An online engine over memory storage and a mock remote.
///
/// Returns the engine plus handles sharing its storage and remote.
pub fn online_engine() -> (TestEngine, Arc<MemoryStorage>, MockRemote) {
    let (engine, storage, remote) = offline_engine();
    engine.set_online(true);
    (engine, storage, remote)
}

/// Like [`online_engine`], but starting offline.
pub fn offline_engine() -> (TestEngine, Arc<MemoryStorage>, MockRemote) {
    let storage = Arc::new(MemoryStorage::new());
    let remote = MockRemote::new();
    let engine = Engine::create_with_clock(
        Arc::clone(&storage),
        remote.clone(),
        SyncPolicy::default(),
        StepClock::starting_at(1_000),
    );
    (engine, storage, remote)
}
