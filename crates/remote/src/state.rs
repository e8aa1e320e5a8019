// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Server state management.
//!
//! Holds the canonical collections behind one mutex. Every accepted
//! mutation is written through to storage before it becomes visible; a
//! failed write leaves the in-memory state untouched.
//!
//! Mutations tagged with a client action id are remembered, so a client
//! retrying after a lost reply gets `applied` instead of a conflict.

use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use outbox_core::entity::entity_id;
use outbox_core::patch::{self, Collection};
use outbox_core::protocol::{codes, FailureKind, ServerMessage};
use outbox_core::{FileStorage, Operation, Record, Storage};
use serde::{Deserialize, Serialize};

/// Storage key of the persisted collections.
pub const STATE_KEY: &str = "remote.json";

/// Collections this server serves.
pub const COLLECTIONS: [&str; 3] = ["notes", "tasks", "contacts"];

/// Number of applied action ids remembered for deduplication.
pub const APPLIED_LOG_LIMIT: usize = 4096;

/// Why a request could not be served.
#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("unknown collection '{0}'")]
    UnknownCollection(String),

    #[error("{0}")]
    Rejected(String),

    #[error("{collection} {id} already exists")]
    Conflict { collection: String, id: String },

    #[error("{collection} {id} does not exist")]
    NotFound { collection: String, id: String },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl RequestError {
    /// Retrying can only help when the failure was ours.
    pub fn kind(&self) -> FailureKind {
        match self {
            RequestError::Unavailable(_) => FailureKind::Transient,
            _ => FailureKind::Permanent,
        }
    }

    /// Protocol code sent with the rejection.
    pub fn code(&self) -> &'static str {
        match self {
            RequestError::UnknownCollection(_) => codes::UNKNOWN_COLLECTION,
            RequestError::Rejected(_) => codes::REJECTED,
            RequestError::Conflict { .. } => codes::CONFLICT,
            RequestError::NotFound { .. } => codes::NOT_FOUND,
            RequestError::Unavailable(_) => codes::UNAVAILABLE,
        }
    }

    /// Builds the rejection answering `request_id`.
    pub fn into_message(self, request_id: u64) -> ServerMessage {
        ServerMessage::rejected(request_id, self.kind(), self.code(), self.to_string())
    }
}

type Collections = BTreeMap<String, Collection>;

/// Everything persisted under [`STATE_KEY`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Snapshot {
    collections: Collections,
    /// Applied action ids, oldest first.
    #[serde(default)]
    applied: VecDeque<String>,
}

impl Snapshot {
    fn was_applied(&self, action_id: &str) -> bool {
        self.applied.iter().any(|id| id == action_id)
    }

    fn remember(&mut self, action_id: &str) {
        if self.applied.len() >= APPLIED_LOG_LIMIT {
            self.applied.pop_front();
        }
        self.applied.push_back(action_id.to_string());
    }
}

/// Shared server state containing the canonical collections.
#[derive(Clone)]
pub struct ServerState {
    inner: Arc<ServerStateInner>,
}

struct ServerStateInner {
    storage: Box<dyn Storage>,
    state: Mutex<Snapshot>,
}

impl ServerState {
    /// Opens the state persisted in `data_dir`, creating it if needed.
    pub fn open(data_dir: &Path) -> outbox_core::Result<Self> {
        Self::with_storage(FileStorage::open(data_dir)?)
    }

    /// Loads state from any storage backend.
    pub fn with_storage(storage: impl Storage + 'static) -> outbox_core::Result<Self> {
        let mut state: Snapshot = match storage.read(STATE_KEY)? {
            Some(text) if !text.trim().is_empty() => serde_json::from_str(&text).map_err(|e| {
                outbox_core::Error::CorruptedData {
                    key: STATE_KEY.to_string(),
                    reason: e.to_string(),
                }
            })?,
            _ => Snapshot::default(),
        };
        for name in COLLECTIONS {
            state.collections.entry(name.to_string()).or_default();
        }

        Ok(ServerState {
            inner: Arc::new(ServerStateInner {
                storage: Box::new(storage),
                state: Mutex::new(state),
            }),
        })
    }

    /// Applies one mutation and persists it.
    ///
    /// Inserts must not collide with an existing id; updates and deletes
    /// must target an existing one. A mutation whose `action_id` was
    /// already applied succeeds without being applied again.
    pub async fn apply(
        &self,
        collection: &str,
        operation: Operation,
        payload: &Record,
        action_id: Option<&str>,
    ) -> Result<(), RequestError> {
        let mut state = self.inner.state.lock().await;
        let Some(records) = state.collections.get(collection) else {
            return Err(RequestError::UnknownCollection(collection.to_string()));
        };
        let Some(id) = entity_id(payload) else {
            return Err(RequestError::Rejected(
                "payload must include a non-empty string \"id\"".to_string(),
            ));
        };
        if let Some(action_id) = action_id {
            if state.was_applied(action_id) {
                debug!(collection, %operation, id, action_id, "already applied");
                return Ok(());
            }
        }

        let exists = records.contains_key(id);
        match operation {
            Operation::Insert if exists => {
                return Err(RequestError::Conflict {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })
            }
            Operation::Update | Operation::Delete if !exists => {
                return Err(RequestError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })
            }
            _ => {}
        }

        let mut next = state.clone();
        if let Some(records) = next.collections.get_mut(collection) {
            patch::apply(records, operation, payload);
        }
        if let Some(action_id) = action_id {
            next.remember(action_id);
        }
        self.persist(&next)?;
        *state = next;

        debug!(collection, %operation, id, "applied");
        Ok(())
    }

    /// Returns every record of a collection, filtered on
    /// `scope_field == scope` when both are given.
    pub async fn fetch_all(
        &self,
        collection: &str,
        scope_field: Option<&str>,
        scope: Option<&str>,
    ) -> Result<Vec<Record>, RequestError> {
        let state = self.inner.state.lock().await;
        let Some(records) = state.collections.get(collection) else {
            return Err(RequestError::UnknownCollection(collection.to_string()));
        };

        let records = records
            .values()
            .filter(|record| match (scope_field, scope) {
                (Some(field), Some(scope)) => {
                    record.get(field).and_then(|v| v.as_str()) == Some(scope)
                }
                _ => true,
            })
            .cloned()
            .collect();
        Ok(records)
    }

    /// Total number of stored records.
    pub async fn record_count(&self) -> usize {
        let state = self.inner.state.lock().await;
        state.collections.values().map(|c| c.len()).sum()
    }

    fn persist(&self, state: &Snapshot) -> Result<(), RequestError> {
        let text = serde_json::to_string(state)
            .map_err(|e| RequestError::Unavailable(e.to_string()))?;
        self.inner.storage.write(STATE_KEY, &text).map_err(|e| {
            warn!(error = %e, "failed to persist state");
            RequestError::Unavailable(e.to_string())
        })
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
