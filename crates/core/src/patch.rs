// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Optimistic patch rules for cached collections.
//!
//! Rules:
//! - Insert: add or overwrite the record keyed by its id
//! - Update: shallow-merge top-level fields into the record with that id,
//!   creating it from the payload if absent
//! - Delete: remove the record with that id (absent is a no-op)
//!
//! Every rule is idempotent: applying the same mutation twice leaves the
//! collection as applying it once does.

use std::collections::BTreeMap;

use crate::action::PendingAction;
use crate::entity::{entity_id, Operation, Record};

/// One cached collection, keyed by entity id.
pub type Collection = BTreeMap<String, Record>;

/// Applies one mutation to a collection.
///
/// Returns `true` if the collection changed. Payloads without an id are
/// ignored; the queue never admits them.
pub fn apply(collection: &mut Collection, operation: Operation, payload: &Record) -> bool {
    let Some(id) = entity_id(payload) else {
        return false;
    };

    match operation {
        Operation::Insert => {
            let previous = collection.insert(id.to_string(), payload.clone());
            previous.as_ref() != Some(payload)
        }
        Operation::Update => match collection.get_mut(id) {
            Some(existing) => {
                let mut changed = false;
                for (field, value) in payload {
                    if existing.get(field) != Some(value) {
                        existing.insert(field.clone(), value.clone());
                        changed = true;
                    }
                }
                changed
            }
            None => {
                collection.insert(id.to_string(), payload.clone());
                true
            }
        },
        Operation::Delete => collection.remove(id).is_some(),
    }
}

/// Re-applies pending actions, in order, on top of a collection.
///
/// Returns the number of actions that changed the collection.
pub fn rebase<'a>(
    collection: &mut Collection,
    actions: impl IntoIterator<Item = &'a PendingAction>,
) -> usize {
    let mut changed = 0;
    for action in actions {
        if apply(collection, action.operation, &action.payload) {
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
#[path = "patch_tests.rs"]
mod tests;
