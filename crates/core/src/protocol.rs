// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol messages between the sync engine and a remote store.
//!
//! The protocol is request/response:
//! - Client sends one mutation (`apply`) or one collection read (`fetch_all`)
//!   tagged with a client-chosen `request_id`
//! - Server answers each request with a message carrying the same
//!   `request_id`
//!
//! Failures are classified by the server so the client knows whether a
//! retry can help.

use serde::{Deserialize, Serialize};

use crate::entity::{Operation, Record};

/// Whether a failed request may succeed if retried later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The same request may succeed later (overload, storage hiccup).
    Transient,
    /// Retrying will not help (bad payload, conflict, missing entity).
    Permanent,
}

/// Rejection codes shared by both ends.
pub mod codes {
    /// Payload failed validation.
    pub const REJECTED: &str = "rejected";
    /// Insert collided with an existing entity.
    pub const CONFLICT: &str = "conflict";
    /// Update or delete targeted an entity that does not exist.
    pub const NOT_FOUND: &str = "not_found";
    /// Server cannot serve the request right now.
    pub const UNAVAILABLE: &str = "unavailable";
    /// Server is shedding load.
    pub const RATE_LIMITED: &str = "rate_limited";
    /// Unknown collection name.
    pub const UNKNOWN_COLLECTION: &str = "unknown_collection";
}

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Apply one mutation to a collection.
    Apply {
        request_id: u64,
        collection: String,
        operation: Operation,
        payload: Record,
        /// Client action id; a repeat of an applied one is answered
        /// `applied` without being applied twice.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        action_id: Option<String>,
    },

    /// Read every record of a collection.
    FetchAll {
        request_id: u64,
        collection: String,
        /// Field to filter on; ignored when `scope` is `None`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scope_field: Option<String>,
        /// Only return records whose `scope_field` equals this value.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scope: Option<String>,
    },

    /// Ping message for keepalive.
    Ping {
        /// Client-chosen ID echoed in Pong.
        id: u64,
    },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The mutation was committed.
    Applied { request_id: u64 },

    /// The request failed.
    Rejected {
        request_id: u64,
        kind: FailureKind,
        /// Machine-readable reason, one of [`codes`].
        code: String,
        /// Human-readable description.
        reason: String,
    },

    /// Response to a FetchAll request.
    Entities {
        request_id: u64,
        records: Vec<Record>,
    },

    /// Pong response to client Ping.
    Pong {
        /// Echoed from the Ping message.
        id: u64,
    },

    /// Error not tied to a request (for example an unparseable frame).
    Error {
        /// Human-readable error description.
        message: String,
    },
}

impl ClientMessage {
    /// Creates an Apply message.
    pub fn apply(
        request_id: u64,
        collection: impl Into<String>,
        operation: Operation,
        payload: Record,
    ) -> Self {
        ClientMessage::Apply {
            request_id,
            collection: collection.into(),
            operation,
            payload,
            action_id: None,
        }
    }

    /// Tags an Apply message with the action id it delivers.
    pub fn with_action_id(mut self, id: impl Into<String>) -> Self {
        if let ClientMessage::Apply { action_id, .. } = &mut self {
            *action_id = Some(id.into());
        }
        self
    }

    /// Creates a FetchAll message.
    pub fn fetch_all(
        request_id: u64,
        collection: impl Into<String>,
        scope_field: Option<String>,
        scope: Option<String>,
    ) -> Self {
        ClientMessage::FetchAll {
            request_id,
            collection: collection.into(),
            scope_field,
            scope,
        }
    }

    /// Creates a Ping message.
    pub fn ping(id: u64) -> Self {
        ClientMessage::Ping { id }
    }

    /// Returns the request id, if this message expects a correlated answer.
    pub fn request_id(&self) -> Option<u64> {
        match self {
            ClientMessage::Apply { request_id, .. }
            | ClientMessage::FetchAll { request_id, .. } => Some(*request_id),
            ClientMessage::Ping { .. } => None,
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Creates an Applied message.
    pub fn applied(request_id: u64) -> Self {
        ServerMessage::Applied { request_id }
    }

    /// Creates a Rejected message.
    pub fn rejected(
        request_id: u64,
        kind: FailureKind,
        code: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ServerMessage::Rejected {
            request_id,
            kind,
            code: code.into(),
            reason: reason.into(),
        }
    }

    /// Creates an Entities message.
    pub fn entities(request_id: u64, records: Vec<Record>) -> Self {
        ServerMessage::Entities {
            request_id,
            records,
        }
    }

    /// Creates a Pong message.
    pub fn pong(id: u64) -> Self {
        ServerMessage::Pong { id }
    }

    /// Creates an Error message.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Returns the id of the request this message answers.
    pub fn request_id(&self) -> Option<u64> {
        match self {
            ServerMessage::Applied { request_id }
            | ServerMessage::Rejected { request_id, .. }
            | ServerMessage::Entities { request_id, .. } => Some(*request_id),
            ServerMessage::Pong { .. } | ServerMessage::Error { .. } => None,
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
