// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::clock::Stamp;
use crate::storage::{FileStorage, MemoryStorage};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::tempdir;

struct FixedClock(AtomicU64);

impl ClockSource for FixedClock {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

fn record(value: Value) -> Record {
    value.as_object().unwrap().clone()
}

fn memory_queue() -> (Arc<MemoryStorage>, ActionQueue<Arc<MemoryStorage>>) {
    let storage = Arc::new(MemoryStorage::new());
    let queue = ActionQueue::load(Arc::clone(&storage)).unwrap();
    (storage, queue)
}

#[test]
fn load_from_empty_storage() {
    let (_, queue) = memory_queue();
    assert!(queue.is_empty());
    assert_eq!(queue.len(), 0);
}

#[test]
fn enqueue_preserves_order() {
    let (_, mut queue) = memory_queue();

    let a = queue
        .enqueue(EntityType::Note, Operation::Insert, record(json!({"id": "n1"})))
        .unwrap();
    let b = queue
        .enqueue(EntityType::Task, Operation::Insert, record(json!({"id": "t1"})))
        .unwrap();
    let c = queue
        .enqueue(EntityType::Note, Operation::Delete, record(json!({"id": "n1"})))
        .unwrap();

    let ids: Vec<_> = queue.all().iter().map(|a| a.id.clone()).collect();
    assert_eq!(ids, vec![a, b, c]);
    assert!(queue.all().windows(2).all(|w| w[0].enqueued_at < w[1].enqueued_at));
}

#[test]
fn enqueue_rejects_missing_id() {
    let (storage, mut queue) = memory_queue();
    let err = queue
        .enqueue(EntityType::Task, Operation::Update, record(json!({"done": true})))
        .unwrap_err();

    assert!(matches!(err, Error::MissingEntityId { .. }));
    assert!(queue.is_empty());
    assert!(storage.raw(QUEUE_KEY).is_none());
}

#[test]
fn enqueue_failure_leaves_queue_unchanged() {
    let (storage, mut queue) = memory_queue();
    queue
        .enqueue(EntityType::Note, Operation::Insert, record(json!({"id": "n1"})))
        .unwrap();
    let before = storage.raw(QUEUE_KEY);

    storage.set_fail_writes(true);
    let result = queue.enqueue(EntityType::Note, Operation::Insert, record(json!({"id": "n2"})));

    assert!(matches!(result, Err(Error::Storage { .. })));
    assert_eq!(queue.len(), 1);
    assert_eq!(storage.raw(QUEUE_KEY), before);
}

#[test]
fn enqueue_survives_restart() {
    let dir = tempdir().unwrap();
    let original = {
        let mut queue = ActionQueue::load(FileStorage::open(dir.path()).unwrap()).unwrap();
        queue
            .enqueue(
                EntityType::Contact,
                Operation::Insert,
                record(json!({"id": "c1", "name": "Ada"})),
            )
            .unwrap();
        queue
            .enqueue(
                EntityType::Contact,
                Operation::Update,
                record(json!({"id": "c1", "name": "Ada L."})),
            )
            .unwrap();
        queue.all().to_vec()
    };

    let queue = ActionQueue::load(FileStorage::open(dir.path()).unwrap()).unwrap();
    assert_eq!(queue.all(), original.as_slice());
}

#[test]
fn reload_is_byte_identical() {
    let (storage, mut queue) = memory_queue();
    queue
        .enqueue(EntityType::Note, Operation::Insert, record(json!({"id": "n1", "body": "x"})))
        .unwrap();
    let first = storage.raw(QUEUE_KEY).unwrap();

    let reloaded = ActionQueue::load(Arc::clone(&storage)).unwrap();
    assert_eq!(jsonl::encode(reloaded.all()).unwrap(), first);
}

#[test]
fn restored_stamps_seed_the_clock() {
    let storage = Arc::new(MemoryStorage::new());
    let clock = Arc::new(FixedClock(AtomicU64::new(5_000)));

    let old_id = {
        let mut queue = ActionQueue::load_with_clock(Arc::clone(&storage), clock.clone()).unwrap();
        queue
            .enqueue(EntityType::Note, Operation::Insert, record(json!({"id": "n1"})))
            .unwrap()
    };

    // Wall clock jumped backwards across the restart
    clock.0.store(1_000, Ordering::SeqCst);
    let mut queue = ActionQueue::load_with_clock(Arc::clone(&storage), clock).unwrap();
    let new_id = queue
        .enqueue(EntityType::Note, Operation::Insert, record(json!({"id": "n2"})))
        .unwrap();

    let old = queue.get(&old_id).unwrap().enqueued_at;
    let new = queue.get(&new_id).unwrap().enqueued_at;
    assert!(new > old);
    assert_eq!(new, Stamp::new(5_000, 1));
}

#[test]
fn load_sorts_by_stamp() {
    let storage = MemoryStorage::new();
    let late = PendingAction::new(
        EntityType::Task,
        Operation::Insert,
        record(json!({"id": "t2"})),
        Stamp::new(20, 0),
    );
    let early = PendingAction::new(
        EntityType::Task,
        Operation::Insert,
        record(json!({"id": "t1"})),
        Stamp::new(10, 0),
    );
    storage
        .write(QUEUE_KEY, &jsonl::encode(&[late.clone(), early.clone()]).unwrap())
        .unwrap();

    let queue = ActionQueue::load(storage).unwrap();
    assert_eq!(queue.all(), &[early, late]);
}

#[test]
fn load_reports_corruption() {
    let storage = MemoryStorage::new();
    storage.write(QUEUE_KEY, "{\"id\": 12\n").unwrap();

    let result = ActionQueue::load(storage);
    assert!(matches!(result, Err(Error::CorruptedData { ref key, .. }) if key == QUEUE_KEY));
}

#[test]
fn remove_deletes_one_action() {
    let (storage, mut queue) = memory_queue();
    let a = queue
        .enqueue(EntityType::Note, Operation::Insert, record(json!({"id": "n1"})))
        .unwrap();
    let b = queue
        .enqueue(EntityType::Note, Operation::Insert, record(json!({"id": "n2"})))
        .unwrap();

    let removed = queue.remove(&a).unwrap().unwrap();
    assert_eq!(removed.id, a);
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.all()[0].id, b);

    let reloaded = ActionQueue::load(Arc::clone(&storage)).unwrap();
    assert_eq!(reloaded.len(), 1);
}

#[test]
fn remove_absent_id_does_not_write() {
    let (storage, mut queue) = memory_queue();
    queue
        .enqueue(EntityType::Note, Operation::Insert, record(json!({"id": "n1"})))
        .unwrap();

    storage.set_fail_writes(true);
    let result = queue.remove(&ActionId::from("act-missing"));
    assert!(matches!(result, Ok(None)));
}

#[test]
fn remove_failure_restores_position() {
    let (storage, mut queue) = memory_queue();
    let a = queue
        .enqueue(EntityType::Note, Operation::Insert, record(json!({"id": "n1"})))
        .unwrap();
    queue
        .enqueue(EntityType::Note, Operation::Insert, record(json!({"id": "n2"})))
        .unwrap();
    let before = queue.all().to_vec();

    storage.set_fail_writes(true);
    assert!(queue.remove(&a).is_err());
    assert_eq!(queue.all(), before.as_slice());
}

#[test]
fn requeue_increments_retry_in_place() {
    let (storage, mut queue) = memory_queue();
    let a = queue
        .enqueue(EntityType::Task, Operation::Update, record(json!({"id": "t1", "done": true})))
        .unwrap();
    queue
        .enqueue(EntityType::Task, Operation::Delete, record(json!({"id": "t2"})))
        .unwrap();

    assert_eq!(queue.requeue_with_incremented_retry(&a).unwrap(), Some(1));
    assert_eq!(queue.requeue_with_incremented_retry(&a).unwrap(), Some(2));
    assert_eq!(queue.all()[0].id, a);

    let reloaded = ActionQueue::load(Arc::clone(&storage)).unwrap();
    assert_eq!(reloaded.get(&a).unwrap().retry_count, 2);
}

#[test]
fn requeue_failure_keeps_retry_count() {
    let (storage, mut queue) = memory_queue();
    let a = queue
        .enqueue(EntityType::Task, Operation::Insert, record(json!({"id": "t1"})))
        .unwrap();

    storage.set_fail_writes(true);
    assert!(queue.requeue_with_incremented_retry(&a).is_err());
    assert_eq!(queue.get(&a).unwrap().retry_count, 0);
}

#[test]
fn requeue_absent_id() {
    let (_, mut queue) = memory_queue();
    assert_eq!(
        queue
            .requeue_with_incremented_retry(&ActionId::from("act-missing"))
            .unwrap(),
        None
    );
}

#[test]
fn pending_for_filters_by_type() {
    let (_, mut queue) = memory_queue();
    queue
        .enqueue(EntityType::Note, Operation::Insert, record(json!({"id": "n1"})))
        .unwrap();
    queue
        .enqueue(EntityType::Task, Operation::Insert, record(json!({"id": "t1"})))
        .unwrap();
    queue
        .enqueue(EntityType::Note, Operation::Update, record(json!({"id": "n1", "x": 1})))
        .unwrap();

    let notes: Vec<_> = queue.pending_for(EntityType::Note).collect();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[1].operation, Operation::Update);
    assert_eq!(queue.pending_for(EntityType::Contact).count(), 0);
}

#[test]
fn clear_empties_and_persists() {
    let (storage, mut queue) = memory_queue();
    queue
        .enqueue(EntityType::Note, Operation::Insert, record(json!({"id": "n1"})))
        .unwrap();

    queue.clear().unwrap();
    assert!(queue.is_empty());
    assert!(ActionQueue::load(storage).unwrap().is_empty());
}
