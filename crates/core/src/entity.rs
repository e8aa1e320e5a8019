// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Entity collections and mutation kinds.
//!
//! Records are denormalized JSON objects keyed by their string `"id"` field.
//! The set of collections is closed: every [`EntityType`] is bound to a
//! concrete remote adapter at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A cached or remote entity: a JSON object with a string `"id"` field.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Field holding the entity identifier in every record.
pub const ID_FIELD: &str = "id";

/// Logical collection targeted by a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// Free-form notes.
    Note,
    /// Actionable to-do items.
    Task,
    /// People the user keeps track of.
    Contact,
}

impl EntityType {
    /// Every entity type, in persistence order.
    pub const ALL: [EntityType; 3] = [EntityType::Note, EntityType::Task, EntityType::Contact];

    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Note => "note",
            EntityType::Task => "task",
            EntityType::Contact => "contact",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "note" | "notes" => Ok(EntityType::Note),
            "task" | "tasks" => Ok(EntityType::Task),
            "contact" | "contacts" => Ok(EntityType::Contact),
            _ => Err(Error::InvalidEntityType(s.to_string())),
        }
    }
}

/// Kind of mutation carried by a pending action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Create a record (or overwrite one with the same id).
    Insert,
    /// Merge fields into an existing record.
    Update,
    /// Remove a record.
    Delete,
}

impl Operation {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "insert" => Ok(Operation::Insert),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            _ => Err(Error::InvalidOperation(s.to_string())),
        }
    }
}

/// Returns the entity id of a record, if it has a non-empty string id.
pub fn entity_id(record: &Record) -> Option<&str> {
    record
        .get(ID_FIELD)
        .and_then(|v| v.as_str())
        .filter(|id| !id.is_empty())
}

/// Converts an arbitrary JSON value into a mutation payload.
///
/// The value must be an object carrying a non-empty string `"id"`.
pub fn payload_from_value(
    entity_type: EntityType,
    operation: Operation,
    value: serde_json::Value,
) -> Result<Record> {
    let serde_json::Value::Object(record) = value else {
        return Err(Error::InvalidPayload(format!(
            "{operation} on {entity_type} expects a JSON object"
        )));
    };
    validate_payload(entity_type, operation, &record)?;
    Ok(record)
}

/// Checks that a payload identifies its target entity.
pub fn validate_payload(
    entity_type: EntityType,
    operation: Operation,
    payload: &Record,
) -> Result<()> {
    if entity_id(payload).is_none() {
        return Err(Error::MissingEntityId {
            entity_type: entity_type.to_string(),
            operation: operation.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "entity_tests.rs"]
mod tests;
