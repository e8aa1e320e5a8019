// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Local requests to a running `outbox watch`.
//!
//! `watch` holds the single-writer lock for as long as it runs, so other
//! commands hand their mutations to it over a Unix socket in the data
//! directory instead of opening the queue themselves. Messages are JSON
//! with a 4-byte big-endian length prefix.

use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::Path;
use std::time::Duration;

use outbox_core::{ActionId, EntityType, Operation, Record};
use serde::{Deserialize, Serialize};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::socket_path;
use crate::error::{Error, Result};
use crate::sync::SyncHandle;

/// Read/write timeout for one request from the client side.
const TIMEOUT_SECS: u64 = 5;

/// Request sent to a running watcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WatchRequest {
    /// Queue one mutation.
    Enqueue {
        entity_type: EntityType,
        operation: Operation,
        payload: Record,
    },
}

/// Answer from a running watcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WatchResponse {
    /// The mutation is queued under this action id.
    Enqueued { id: String },
    /// The request failed.
    Error { message: String },
}

pub mod framing {
    use std::io::{Read, Write};

    use serde::de::DeserializeOwned;
    use serde::Serialize;
    use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

    use crate::error::{Error, Result};

    /// Maximum message size (1MB) to prevent malformed frames from causing hangs.
    const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

    fn encode<T: Serialize>(msg: &T) -> Result<(u32, Vec<u8>)> {
        let json = serde_json::to_vec(msg)?;
        let len = u32::try_from(json.len())
            .map_err(|_| Error::Io(std::io::Error::other("message too large")))?;
        Ok((len, json))
    }

    fn check_len(len_buf: [u8; 4]) -> Result<usize> {
        let len = u32::from_be_bytes(len_buf) as usize;
        if len > MAX_MESSAGE_SIZE {
            return Err(Error::Io(std::io::Error::other(format!(
                "message too large: {} bytes (max {})",
                len, MAX_MESSAGE_SIZE
            ))));
        }
        Ok(len)
    }

    /// Write one message to a blocking writer.
    pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, msg: &T) -> Result<()> {
        let (len, json) = encode(msg)?;
        writer.write_all(&len.to_be_bytes())?;
        writer.write_all(&json)?;
        writer.flush()?;
        Ok(())
    }

    /// Read one message from a blocking reader.
    pub fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T> {
        let mut len_buf = [0u8; 4];
        reader.read_exact(&mut len_buf)?;
        let mut buf = vec![0u8; check_len(len_buf)?];
        reader.read_exact(&mut buf)?;
        Ok(serde_json::from_slice(&buf)?)
    }

    /// Write one message to an async writer.
    pub async fn write_frame_async<W, T>(writer: &mut W, msg: &T) -> Result<()>
    where
        W: AsyncWrite + Unpin,
        T: Serialize,
    {
        let (len, json) = encode(msg)?;
        writer.write_all(&len.to_be_bytes()).await?;
        writer.write_all(&json).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Read one message from an async reader.
    pub async fn read_frame_async<R, T>(reader: &mut R) -> Result<T>
    where
        R: AsyncRead + Unpin,
        T: DeserializeOwned,
    {
        let mut len_buf = [0u8; 4];
        reader.read_exact(&mut len_buf).await?;
        let mut buf = vec![0u8; check_len(len_buf)?];
        reader.read_exact(&mut buf).await?;
        Ok(serde_json::from_slice(&buf)?)
    }
}

/// A client connection to a running watcher.
pub struct WatchClient {
    stream: StdUnixStream,
}

impl WatchClient {
    /// Connects to the watcher serving `data_dir`.
    pub fn connect(data_dir: &Path) -> Result<Self> {
        let stream = StdUnixStream::connect(socket_path(data_dir))?;
        stream.set_read_timeout(Some(Duration::from_secs(TIMEOUT_SECS)))?;
        stream.set_write_timeout(Some(Duration::from_secs(TIMEOUT_SECS)))?;
        Ok(WatchClient { stream })
    }

    /// Send a request and receive its answer.
    fn request(&mut self, request: &WatchRequest) -> Result<WatchResponse> {
        framing::write_frame(&mut self.stream, request)?;
        framing::read_frame(&mut self.stream)
    }

    /// Queues one mutation on the watcher's engine.
    pub fn enqueue(
        &mut self,
        entity_type: EntityType,
        operation: Operation,
        payload: Record,
    ) -> Result<ActionId> {
        let request = WatchRequest::Enqueue {
            entity_type,
            operation,
            payload,
        };
        match self.request(&request)? {
            WatchResponse::Enqueued { id } => Ok(ActionId::from(id.as_str())),
            WatchResponse::Error { message } => Err(Error::Watcher(message)),
        }
    }
}

/// Binds the request socket of `data_dir`.
///
/// The caller must hold the single-writer lock; a socket file left behind
/// by a crashed watcher is replaced.
pub fn bind(data_dir: &Path) -> Result<UnixListener> {
    let path = socket_path(data_dir);
    match std::fs::remove_file(&path) {
        Ok(()) => debug!(path = %path.display(), "removed stale socket"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    Ok(UnixListener::bind(&path)?)
}

/// Answers requests on `listener` through `handle` until `shutdown` fires.
pub async fn serve(listener: UnixListener, handle: SyncHandle, shutdown: CancellationToken) {
    loop {
        let stream = tokio::select! {
            _ = shutdown.cancelled() => return,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => stream,
                Err(e) => {
                    warn!(error = %e, "failed to accept request");
                    continue;
                }
            },
        };

        let handle = handle.clone();
        tokio::spawn(async move {
            if let Err(e) = answer(stream, &handle).await {
                warn!(error = %e, "failed to answer request");
            }
        });
    }
}

async fn answer(mut stream: UnixStream, handle: &SyncHandle) -> Result<()> {
    let request: WatchRequest = framing::read_frame_async(&mut stream).await?;
    debug!(?request, "watch request");

    let response = match request {
        WatchRequest::Enqueue {
            entity_type,
            operation,
            payload,
        } => match handle.enqueue(entity_type, operation, payload).await {
            Ok(id) => WatchResponse::Enqueued { id: id.to_string() },
            Err(e) => WatchResponse::Error {
                message: e.to_string(),
            },
        },
    };
    framing::write_frame_async(&mut stream, &response).await
}

#[cfg(test)]
#[path = "ipc_tests.rs"]
mod tests;
