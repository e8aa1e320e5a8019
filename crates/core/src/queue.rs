// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable queue of pending actions.
//!
//! The queue is persisted as JSONL under [`QUEUE_KEY`], one action per line
//! in replay order. Every mutation rewrites the whole value through
//! [`Storage::write`] before returning, and a failed write leaves the
//! in-memory queue exactly as it was before the call.

use std::sync::Arc;

use tracing::debug;

use crate::action::{ActionId, PendingAction};
use crate::clock::{ClockSource, StampClock, SystemClock};
use crate::entity::{validate_payload, EntityType, Operation, Record};
use crate::error::{Error, Result};
use crate::jsonl;
use crate::storage::{Storage, QUEUE_KEY};

/// Ordered, durably persisted list of not-yet-committed mutations.
pub struct ActionQueue<S: Storage> {
    storage: S,
    clock: StampClock<Arc<dyn ClockSource>>,
    actions: Vec<PendingAction>,
}

impl<S: Storage> ActionQueue<S> {
    /// Creates an empty queue without reading storage.
    ///
    /// The first mutation overwrites whatever was persisted before.
    pub fn new(storage: S, clock: Arc<dyn ClockSource>) -> Self {
        ActionQueue {
            storage,
            clock: StampClock::with_clock(clock),
            actions: Vec::new(),
        }
    }

    /// Restores the queue from storage, stamping new actions with the
    /// system clock.
    pub fn load(storage: S) -> Result<Self> {
        Self::load_with_clock(storage, Arc::new(SystemClock))
    }

    /// Restores the queue from storage with a custom clock source.
    ///
    /// The stamp clock is advanced past the newest restored action so that
    /// new actions always sort after the ones already queued.
    pub fn load_with_clock(storage: S, clock: Arc<dyn ClockSource>) -> Result<Self> {
        let mut actions: Vec<PendingAction> = match storage.read(QUEUE_KEY)? {
            Some(text) => jsonl::decode(&text).map_err(|e| Error::CorruptedData {
                key: QUEUE_KEY.to_string(),
                reason: e.to_string(),
            })?,
            None => Vec::new(),
        };
        actions.sort_by_key(|a| a.enqueued_at);

        let clock = StampClock::with_clock(clock);
        if let Some(newest) = actions.last() {
            clock.observe(&newest.enqueued_at);
        }

        debug!(count = actions.len(), "loaded action queue");
        Ok(ActionQueue {
            storage,
            clock,
            actions,
        })
    }

    /// Appends a new action and persists the queue.
    ///
    /// The payload must carry a non-empty string `"id"`.
    pub fn enqueue(
        &mut self,
        entity_type: EntityType,
        operation: Operation,
        payload: Record,
    ) -> Result<ActionId> {
        validate_payload(entity_type, operation, &payload)?;

        let action = PendingAction::new(entity_type, operation, payload, self.clock.now());
        let id = action.id.clone();
        self.actions.push(action);

        if let Err(e) = self.persist() {
            self.actions.pop();
            return Err(e);
        }

        debug!(%id, %entity_type, %operation, "enqueued action");
        Ok(id)
    }

    /// Returns every queued action in replay order.
    pub fn all(&self) -> &[PendingAction] {
        &self.actions
    }

    /// Looks up a queued action by id.
    pub fn get(&self, id: &ActionId) -> Option<&PendingAction> {
        self.actions.iter().find(|a| &a.id == id)
    }

    /// Returns the number of queued actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Returns the queued actions targeting one entity type, in replay order.
    pub fn pending_for(&self, entity_type: EntityType) -> impl Iterator<Item = &PendingAction> {
        self.actions
            .iter()
            .filter(move |a| a.entity_type == entity_type)
    }

    /// Removes an action and persists the queue.
    ///
    /// Returns `Ok(None)` without writing if the id is not queued.
    pub fn remove(&mut self, id: &ActionId) -> Result<Option<PendingAction>> {
        let Some(index) = self.actions.iter().position(|a| &a.id == id) else {
            return Ok(None);
        };

        let action = self.actions.remove(index);
        if let Err(e) = self.persist() {
            self.actions.insert(index, action);
            return Err(e);
        }

        debug!(%id, "removed action");
        Ok(Some(action))
    }

    /// Increments an action's retry count in place and persists the queue.
    ///
    /// Returns the new retry count, or `Ok(None)` if the id is not queued.
    /// The action keeps its position in the replay order.
    pub fn requeue_with_incremented_retry(&mut self, id: &ActionId) -> Result<Option<u32>> {
        let Some(action) = self.actions.iter_mut().find(|a| &a.id == id) else {
            return Ok(None);
        };

        let previous = action.retry_count;
        action.retry_count = previous.saturating_add(1);
        let retry_count = action.retry_count;

        if let Err(e) = self.persist() {
            if let Some(action) = self.actions.iter_mut().find(|a| &a.id == id) {
                action.retry_count = previous;
            }
            return Err(e);
        }

        debug!(%id, retry_count, "requeued action");
        Ok(Some(retry_count))
    }

    /// Drops every queued action and persists the empty queue.
    pub fn clear(&mut self) -> Result<()> {
        self.storage.write(QUEUE_KEY, "")?;
        self.actions.clear();
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        let text = jsonl::encode(&self.actions)?;
        self.storage.write(QUEUE_KEY, &text)
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
