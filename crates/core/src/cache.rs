// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Local snapshot cache of remote entities.
//!
//! The snapshot holds one collection per entity type plus the time of the
//! last wholesale refresh. It is persisted as a single JSON document under
//! [`CACHE_KEY`]; like the queue, a failed write leaves the in-memory
//! snapshot untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::PendingAction;
use crate::entity::{entity_id, EntityType, Operation, Record};
use crate::error::{Error, Result};
use crate::patch::{self, Collection};
use crate::storage::{Storage, CACHE_KEY};

/// Persisted form of the cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub note: Collection,
    #[serde(default)]
    pub task: Collection,
    #[serde(default)]
    pub contact: Collection,
    /// When a collection was last replaced from the remote store.
    #[serde(default)]
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Returns the collection for an entity type.
    pub fn collection(&self, entity_type: EntityType) -> &Collection {
        match entity_type {
            EntityType::Note => &self.note,
            EntityType::Task => &self.task,
            EntityType::Contact => &self.contact,
        }
    }

    fn collection_mut(&mut self, entity_type: EntityType) -> &mut Collection {
        match entity_type {
            EntityType::Note => &mut self.note,
            EntityType::Task => &mut self.task,
            EntityType::Contact => &mut self.contact,
        }
    }
}

/// Durable, denormalized copy of the remote entities.
pub struct SnapshotCache<S: Storage> {
    storage: S,
    snapshot: Snapshot,
}

impl<S: Storage> SnapshotCache<S> {
    /// Creates an empty cache without reading storage.
    pub fn new(storage: S) -> Self {
        SnapshotCache {
            storage,
            snapshot: Snapshot::default(),
        }
    }

    /// Restores the cache from storage (empty if nothing was stored).
    pub fn load(storage: S) -> Result<Self> {
        let snapshot = match storage.read(CACHE_KEY)? {
            Some(text) if !text.trim().is_empty() => {
                serde_json::from_str(&text).map_err(|e| Error::CorruptedData {
                    key: CACHE_KEY.to_string(),
                    reason: e.to_string(),
                })?
            }
            _ => Snapshot::default(),
        };
        Ok(SnapshotCache { storage, snapshot })
    }

    /// Replaces one collection wholesale with records fetched from the
    /// remote store and records the refresh time.
    ///
    /// Records without a string id are skipped. Returns the number of
    /// records kept.
    pub fn refresh_from_remote(
        &mut self,
        entity_type: EntityType,
        entities: Vec<Record>,
    ) -> Result<usize> {
        self.refresh_rebased(entity_type, entities, std::iter::empty())
    }

    /// Like [`refresh_from_remote`](Self::refresh_from_remote), then
    /// re-applies still-pending actions on top of the fresh collection so
    /// the snapshot keeps reflecting them.
    pub fn refresh_rebased<'a>(
        &mut self,
        entity_type: EntityType,
        entities: Vec<Record>,
        pending: impl IntoIterator<Item = &'a PendingAction>,
    ) -> Result<usize> {
        let mut fresh = Collection::new();
        for record in entities {
            match entity_id(&record) {
                Some(id) => {
                    fresh.insert(id.to_string(), record);
                }
                None => debug!(%entity_type, "skipping fetched record without id"),
            }
        }
        let kept = fresh.len();
        let rebased = patch::rebase(
            &mut fresh,
            pending.into_iter().filter(|a| a.entity_type == entity_type),
        );

        let mut next = self.snapshot.clone();
        *next.collection_mut(entity_type) = fresh;
        next.last_synced_at = Some(Utc::now());
        self.commit(next)?;

        debug!(%entity_type, kept, rebased, "refreshed collection");
        Ok(kept)
    }

    /// Optimistically applies a mutation and persists the result.
    ///
    /// Returns `true` if the cached collection changed.
    pub fn apply_optimistic(
        &mut self,
        entity_type: EntityType,
        operation: Operation,
        payload: &Record,
    ) -> Result<bool> {
        let mut next = self.snapshot.clone();
        if !patch::apply(next.collection_mut(entity_type), operation, payload) {
            return Ok(false);
        }
        self.commit(next)?;
        Ok(true)
    }

    /// Returns the cached records of one entity type, ordered by id.
    pub fn read(&self, entity_type: EntityType) -> Vec<Record> {
        self.snapshot
            .collection(entity_type)
            .values()
            .cloned()
            .collect()
    }

    /// Returns one cached record.
    pub fn get(&self, entity_type: EntityType, id: &str) -> Option<&Record> {
        self.snapshot.collection(entity_type).get(id)
    }

    /// Returns when the cache was last refreshed from the remote store.
    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot.last_synced_at
    }

    /// Returns the whole snapshot.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Drops every collection and the refresh time.
    pub fn clear(&mut self) -> Result<()> {
        self.commit(Snapshot::default())
    }

    fn commit(&mut self, next: Snapshot) -> Result<()> {
        let text = serde_json::to_string(&next)?;
        self.storage.write(CACHE_KEY, &text)?;
        self.snapshot = next;
        Ok(())
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
