// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote store adapters.
//!
//! [`RemoteStore`] is the seam the sync processor talks to. Each entity type
//! is bound to one [`CollectionAdapter`] that knows its remote collection
//! and its scope field. Payloads without an entity id are rejected without
//! a round-trip.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use outbox_core::entity::entity_id;
use outbox_core::protocol::{codes, ClientMessage, FailureKind, ServerMessage};
use outbox_core::{ActionId, EntityType, Operation, PendingAction, Record};
use tracing::debug;

use super::transport::{Transport, WebSocketTransport};

/// Failure reported by a remote store call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The network path to the remote is down.
    #[error("remote unreachable: {0}")]
    Unreachable(String),

    /// No response within the request timeout.
    #[error("remote request timed out after {0}ms")]
    Timeout(u64),

    /// The remote is shedding load.
    #[error("remote rate limited: {0}")]
    RateLimited(String),

    /// The remote cannot serve the request right now.
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// The payload is invalid for its collection.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The mutation collides with existing remote state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The targeted entity does not exist remotely.
    #[error("not found: {0}")]
    NotFound(String),
}

impl RemoteError {
    /// Classifies the failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            RemoteError::Unreachable(_)
            | RemoteError::Timeout(_)
            | RemoteError::RateLimited(_)
            | RemoteError::Unavailable(_) => FailureKind::Transient,
            RemoteError::Rejected(_) | RemoteError::Conflict(_) | RemoteError::NotFound(_) => {
                FailureKind::Permanent
            }
        }
    }

    /// Returns `true` if retrying later may succeed.
    pub fn is_transient(&self) -> bool {
        self.kind() == FailureKind::Transient
    }

    /// Maps a server rejection onto an error.
    ///
    /// Unknown codes fall back on the server's classification.
    pub fn from_rejection(kind: FailureKind, code: &str, reason: String) -> Self {
        match code {
            codes::CONFLICT => RemoteError::Conflict(reason),
            codes::NOT_FOUND => RemoteError::NotFound(reason),
            codes::RATE_LIMITED => RemoteError::RateLimited(reason),
            codes::UNAVAILABLE => RemoteError::Unavailable(reason),
            codes::REJECTED => RemoteError::Rejected(reason),
            _ => match kind {
                FailureKind::Transient => RemoteError::Unavailable(reason),
                FailureKind::Permanent => RemoteError::Rejected(reason),
            },
        }
    }
}

/// Boxed future returned by remote store methods.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RemoteError>> + Send + 'a>>;

/// The authoritative data store the engine synchronizes with.
pub trait RemoteStore: Send {
    /// Applies one queued mutation.
    ///
    /// The action id travels with the mutation so a remote that already
    /// committed it can answer a retry with success.
    fn apply<'a>(&'a mut self, action: &'a PendingAction) -> RemoteFuture<'a, ()>;

    /// Fetches every record of one entity type, optionally filtered by scope.
    fn fetch_all(
        &mut self,
        entity_type: EntityType,
        scope: Option<String>,
    ) -> RemoteFuture<'_, Vec<Record>>;

    /// Releases the connection, if any.
    fn close(&mut self) -> RemoteFuture<'_, ()>;
}

/// Per-collection binding between an entity type and the remote store.
pub trait CollectionAdapter: Sync {
    /// Entity type this adapter serves.
    fn entity_type(&self) -> EntityType;

    /// Remote collection name.
    fn collection(&self) -> &'static str;

    /// Field the remote filters on when a scope is given.
    fn scope_field(&self) -> &'static str {
        "owner_id"
    }

    /// Pre-flight validation, run before any network traffic. Only a
    /// missing or empty id is refused; the remote owns every other rule.
    fn validate(&self, payload: &Record) -> Result<(), RemoteError> {
        match entity_id(payload) {
            Some(_) => Ok(()),
            None => Err(RemoteError::Rejected(format!(
                "{} payload has no id",
                self.entity_type()
            ))),
        }
    }

    /// Builds the request delivering one queued action.
    fn apply_request(
        &self,
        request_id: u64,
        action_id: &ActionId,
        operation: Operation,
        payload: Record,
    ) -> Result<ClientMessage, RemoteError> {
        self.validate(&payload)?;
        Ok(
            ClientMessage::apply(request_id, self.collection(), operation, payload)
                .with_action_id(action_id.as_str()),
        )
    }

    /// Builds the request reading the whole collection.
    fn fetch_request(&self, request_id: u64, scope: Option<String>) -> ClientMessage {
        let scope_field = scope.as_ref().map(|_| self.scope_field().to_string());
        ClientMessage::fetch_all(request_id, self.collection(), scope_field, scope)
    }
}

/// Adapter for notes.
pub struct NotesAdapter;

impl CollectionAdapter for NotesAdapter {
    fn entity_type(&self) -> EntityType {
        EntityType::Note
    }

    fn collection(&self) -> &'static str {
        "notes"
    }
}

/// Adapter for tasks.
pub struct TasksAdapter;

impl CollectionAdapter for TasksAdapter {
    fn entity_type(&self) -> EntityType {
        EntityType::Task
    }

    fn collection(&self) -> &'static str {
        "tasks"
    }
}

/// Adapter for contacts.
pub struct ContactsAdapter;

impl CollectionAdapter for ContactsAdapter {
    fn entity_type(&self) -> EntityType {
        EntityType::Contact
    }

    fn collection(&self) -> &'static str {
        "contacts"
    }
}

/// Returns the adapter bound to an entity type.
pub fn adapter_for(entity_type: EntityType) -> &'static dyn CollectionAdapter {
    match entity_type {
        EntityType::Note => &NotesAdapter,
        EntityType::Task => &TasksAdapter,
        EntityType::Contact => &ContactsAdapter,
    }
}

/// [`RemoteStore`] over the WebSocket request/response protocol.
///
/// Connects lazily on the first request and again after any connection loss.
pub struct WebSocketRemote<T: Transport = WebSocketTransport> {
    url: String,
    transport: T,
    timeout: Duration,
    next_request_id: u64,
}

impl WebSocketRemote<WebSocketTransport> {
    /// Creates a remote for `url` using a real WebSocket.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self::with_transport(url, WebSocketTransport::new(), timeout)
    }
}

impl<T: Transport> WebSocketRemote<T> {
    /// Creates a remote with a custom transport.
    pub fn with_transport(url: impl Into<String>, transport: T, timeout: Duration) -> Self {
        WebSocketRemote {
            url: url.into(),
            transport,
            timeout,
            next_request_id: 1,
        }
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        id
    }

    /// Connects if needed. A handshake that outlasts the request timeout
    /// counts as unreachable.
    async fn ensure_connected(&mut self) -> Result<(), RemoteError> {
        if self.transport.is_connected() {
            return Ok(());
        }
        debug!(url = %self.url, "connecting to remote");
        match tokio::time::timeout(self.timeout, self.transport.connect(&self.url)).await {
            Ok(result) => result.map_err(|e| RemoteError::Unreachable(e.to_string())),
            Err(_) => {
                let _ = self.transport.close().await;
                Err(RemoteError::Unreachable("connect timed out".to_string()))
            }
        }
    }

    /// Sends a request and waits for the response carrying its request id.
    async fn request(&mut self, msg: ClientMessage) -> Result<ServerMessage, RemoteError> {
        self.ensure_connected().await?;
        let request_id = msg.request_id();

        self.transport
            .send(msg)
            .await
            .map_err(|e| RemoteError::Unreachable(e.to_string()))?;

        let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        let transport = &mut self.transport;
        let response = tokio::time::timeout(self.timeout, async {
            loop {
                match transport.recv().await {
                    Ok(Some(reply)) if reply.request_id() == request_id => return Ok(reply),
                    Ok(Some(ServerMessage::Error { message })) => {
                        return Err(RemoteError::Unavailable(message))
                    }
                    Ok(Some(other)) => {
                        debug!(?other, "ignoring uncorrelated message");
                    }
                    Ok(None) => {
                        return Err(RemoteError::Unreachable("connection closed".to_string()))
                    }
                    Err(e) => return Err(RemoteError::Unreachable(e.to_string())),
                }
            }
        })
        .await;

        match response {
            Ok(result) => result,
            Err(_) => {
                // A late reply would arrive on a connection nobody correlates
                let _ = self.transport.close().await;
                Err(RemoteError::Timeout(timeout_ms))
            }
        }
    }
}

fn unexpected(reply: &ServerMessage) -> RemoteError {
    RemoteError::Unavailable(format!("unexpected response: {reply:?}"))
}

impl<T: Transport> RemoteStore for WebSocketRemote<T> {
    fn apply<'a>(&'a mut self, action: &'a PendingAction) -> RemoteFuture<'a, ()> {
        Box::pin(async move {
            let request_id = self.next_id();
            let msg = adapter_for(action.entity_type).apply_request(
                request_id,
                &action.id,
                action.operation,
                action.payload.clone(),
            )?;
            match self.request(msg).await? {
                ServerMessage::Applied { .. } => Ok(()),
                ServerMessage::Rejected {
                    kind, code, reason, ..
                } => Err(RemoteError::from_rejection(kind, &code, reason)),
                other => Err(unexpected(&other)),
            }
        })
    }

    fn fetch_all(
        &mut self,
        entity_type: EntityType,
        scope: Option<String>,
    ) -> RemoteFuture<'_, Vec<Record>> {
        Box::pin(async move {
            let request_id = self.next_id();
            let msg = adapter_for(entity_type).fetch_request(request_id, scope);
            match self.request(msg).await? {
                ServerMessage::Entities { records, .. } => Ok(records),
                ServerMessage::Rejected {
                    kind, code, reason, ..
                } => Err(RemoteError::from_rejection(kind, &code, reason)),
                other => Err(unexpected(&other)),
            }
        })
    }

    fn close(&mut self) -> RemoteFuture<'_, ()> {
        Box::pin(async move {
            self.transport
                .close()
                .await
                .map_err(|e| RemoteError::Unreachable(e.to_string()))
        })
    }
}
