// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for the remote store connection.
//!
//! The remote adapter speaks the request/response protocol over any
//! [`Transport`]; production uses a WebSocket, tests script the replies.

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use outbox_core::protocol::{ClientMessage, ServerMessage};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// No open connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Frame could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Boxed future returned by transport methods.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = TransportResult<T>> + Send + 'a>>;

/// Message-oriented duplex connection to a remote store.
pub trait Transport: Send {
    /// Connects to `url`, replacing any previous connection.
    fn connect(&mut self, url: &str) -> TransportFuture<'_, ()>;

    /// Closes the connection, if any.
    fn close(&mut self) -> TransportFuture<'_, ()>;

    /// Sends one message.
    fn send(&mut self, msg: ClientMessage) -> TransportFuture<'_, ()>;

    /// Receives the next message.
    ///
    /// Returns `None` if the connection is closed.
    fn recv(&mut self) -> TransportFuture<'_, Option<ServerMessage>>;

    /// Returns `true` while a connection is open.
    fn is_connected(&self) -> bool;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct WsConnection {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

/// WebSocket transport using tokio-tungstenite.
///
/// Any I/O failure drops the connection so the next request reconnects.
#[derive(Default)]
pub struct WebSocketTransport {
    ws: Option<WsConnection>,
}

impl WebSocketTransport {
    /// Creates a disconnected transport.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for WebSocketTransport {
    fn connect(&mut self, url: &str) -> TransportFuture<'_, ()> {
        let url = url.to_string();
        Box::pin(async move {
            let (ws_stream, _) = tokio_tungstenite::connect_async(&url)
                .await
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
            let (sink, stream) = ws_stream.split();
            self.ws = Some(WsConnection { sink, stream });
            Ok(())
        })
    }

    fn close(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if let Some(mut ws) = self.ws.take() {
                // Peer may already be gone
                let _ = ws.sink.close().await;
            }
            Ok(())
        })
    }

    fn send(&mut self, msg: ClientMessage) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let json = msg
                .to_json()
                .map_err(|e| TransportError::Serialization(e.to_string()))?;
            let ws = self.ws.as_mut().ok_or(TransportError::ConnectionClosed)?;

            // send() flushes, which surfaces a dead peer here rather than on recv
            if let Err(e) = ws.sink.send(Message::Text(json.into())).await {
                self.ws = None;
                return Err(TransportError::SendFailed(e.to_string()));
            }
            Ok(())
        })
    }

    fn recv(&mut self) -> TransportFuture<'_, Option<ServerMessage>> {
        Box::pin(async move {
            let ws = self.ws.as_mut().ok_or(TransportError::ConnectionClosed)?;

            loop {
                match ws.stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        return ServerMessage::from_json(&text)
                            .map(Some)
                            .map_err(|e| TransportError::Serialization(e.to_string()));
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        self.ws = None;
                        return Ok(None);
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        self.ws = None;
                        return Err(TransportError::ReceiveFailed(e.to_string()));
                    }
                }
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.ws.is_some()
    }
}
