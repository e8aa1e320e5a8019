// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for outbox-core operations.

use thiserror::Error;

/// All possible errors that can occur in outbox-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid entity type: '{0}'\n  hint: valid types are: note, task, contact")]
    InvalidEntityType(String),

    #[error("invalid operation: '{0}'\n  hint: valid operations are: insert, update, delete")]
    InvalidOperation(String),

    #[error("payload for {operation} on {entity_type} must include a non-empty string \"id\"")]
    MissingEntityId {
        entity_type: String,
        operation: String,
    },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("storage error for '{key}': {reason}")]
    Storage { key: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data in {key}: {reason}")]
    CorruptedData { key: String, reason: String },
}

/// A specialized Result type for outbox-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
