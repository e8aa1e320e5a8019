// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket server implementation.
//!
//! One task per connection; every text frame is one request and gets
//! exactly one answer on the same connection.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info};

use outbox_core::protocol::{codes, ClientMessage, FailureKind, ServerMessage};

use crate::state::ServerState;

/// Run the WebSocket server on the given address.
pub async fn run(addr: SocketAddr, state: ServerState) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on: {}", addr);
    serve(listener, state).await?;
    Ok(())
}

/// Accepts connections on an already bound listener.
pub async fn serve(listener: TcpListener, state: ServerState) -> std::io::Result<()> {
    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let state = state.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
pub(crate) async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: ServerState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    info!("New WebSocket connection from: {}", peer_addr);

    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    while let Some(msg) = ws_stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let response = handle_text(&text, &state).await;
                ws_sink.send(Message::Text(response.to_json()?.into())).await?;
            }
            Ok(Message::Ping(data)) => {
                ws_sink.send(Message::Pong(data)).await?;
            }
            Ok(Message::Close(_)) => {
                info!("Client {} disconnected", peer_addr);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!("WebSocket error from {}: {}", peer_addr, e);
                break;
            }
        }
    }

    info!("Connection closed: {}", peer_addr);
    Ok(())
}

/// Answers one text frame.
///
/// A frame that names a request id but does not parse (for example an
/// apply whose payload is not an object) is rejected permanently under
/// that id. Frames without a usable id get an `error` message.
pub(crate) async fn handle_text(text: &str, state: &ServerState) -> ServerMessage {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => return ServerMessage::error(format!("invalid frame: {e}")),
    };

    match ClientMessage::deserialize(&value) {
        Ok(msg) => handle_client_message(msg, state).await,
        Err(e) => match value.get("request_id").and_then(Value::as_u64) {
            Some(request_id) => ServerMessage::rejected(
                request_id,
                FailureKind::Permanent,
                codes::REJECTED,
                format!("malformed request: {e}"),
            ),
            None => ServerMessage::error(format!("invalid frame: {e}")),
        },
    }
}

/// Process a client message and return its answer.
async fn handle_client_message(msg: ClientMessage, state: &ServerState) -> ServerMessage {
    debug!("Received message: {:?}", msg);

    match msg {
        ClientMessage::Apply {
            request_id,
            collection,
            operation,
            payload,
            action_id,
        } => match state
            .apply(&collection, operation, &payload, action_id.as_deref())
            .await
        {
            Ok(()) => ServerMessage::applied(request_id),
            Err(e) => {
                debug!(request_id, code = e.code(), "rejected: {}", e);
                e.into_message(request_id)
            }
        },

        ClientMessage::FetchAll {
            request_id,
            collection,
            scope_field,
            scope,
        } => match state
            .fetch_all(&collection, scope_field.as_deref(), scope.as_deref())
            .await
        {
            Ok(records) => {
                debug!("Fetch response: {} {}", records.len(), collection);
                ServerMessage::entities(request_id, records)
            }
            Err(e) => e.into_message(request_id),
        },

        ClientMessage::Ping { id } => ServerMessage::pong(id),
    }
}
