// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Pending mutation intents.
//!
//! A [`PendingAction`] is a mutation the user submitted locally that has not
//! yet been confirmed by the remote store. Actions are replayed in
//! `enqueued_at` order; later actions may depend on the effect of earlier ones
//! (for example an update following an insert of the same entity).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::clock::Stamp;
use crate::entity::{entity_id, EntityType, Operation, Record};

/// Unique identifier of a pending action.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(String);

impl ActionId {
    /// Derive an action ID from its enqueue stamp and contents.
    ///
    /// Format: `act-{hash}` where hash is the first 16 hex chars of
    /// SHA256(stamp + entity type + operation + payload). Stamps never repeat
    /// within a queue, so neither do IDs.
    pub fn generate(
        stamp: &Stamp,
        entity_type: EntityType,
        operation: Operation,
        payload: &Record,
    ) -> Self {
        let input = format!(
            "{stamp}|{entity_type}|{operation}|{}",
            serde_json::Value::Object(payload.clone())
        );
        let hash = Sha256::digest(input.as_bytes());
        ActionId(format!("act-{}", hex::encode(&hash[..8])))
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionId {
    fn from(s: &str) -> Self {
        ActionId(s.to_string())
    }
}

/// A queued, not-yet-confirmed mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: ActionId,
    pub entity_type: EntityType,
    pub operation: Operation,
    pub payload: Record,
    pub enqueued_at: Stamp,
    /// Number of prior failed attempts.
    #[serde(default)]
    pub retry_count: u32,
}

impl PendingAction {
    /// Creates a fresh action with a derived ID and zero retries.
    pub fn new(
        entity_type: EntityType,
        operation: Operation,
        payload: Record,
        enqueued_at: Stamp,
    ) -> Self {
        let id = ActionId::generate(&enqueued_at, entity_type, operation, &payload);
        PendingAction {
            id,
            entity_type,
            operation,
            payload,
            enqueued_at,
            retry_count: 0,
        }
    }

    /// Returns the ID of the entity this action targets.
    pub fn entity_id(&self) -> &str {
        entity_id(&self.payload).unwrap_or("")
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
