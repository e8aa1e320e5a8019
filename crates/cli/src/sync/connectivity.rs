// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity tracking.
//!
//! The monitor holds one boolean that the host feeds from whatever signal it
//! has (a reachability probe, a failed request). Reads are lock-free so
//! status queries never wait on a drain in progress.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// An edge in the connectivity signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Online,
    Offline,
}

/// Current online/offline state plus transition notifications.
pub struct ConnectivityMonitor {
    online: AtomicBool,
    tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// Creates a monitor with the given initial state.
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(online);
        ConnectivityMonitor {
            online: AtomicBool::new(online),
            tx,
        }
    }

    /// Returns the current state.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    /// Feeds a host signal.
    ///
    /// Returns the transition if the state changed, `None` for a repeated
    /// level.
    pub fn observe(&self, online: bool) -> Option<Transition> {
        let previous = self.online.swap(online, Ordering::AcqRel);
        if previous == online {
            return None;
        }
        self.tx.send_replace(online);
        debug!(online, "connectivity changed");
        Some(if online {
            Transition::Online
        } else {
            Transition::Offline
        })
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Attempts one TCP connection to `target` (`host:port`).
pub async fn probe(target: &str, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(timeout, TcpStream::connect(target)).await,
        Ok(Ok(_))
    )
}

/// Spawns a task that probes `target` every `interval` and sends each result.
///
/// The task stops when `cancel` fires or the receiver is dropped.
pub fn spawn_probe(
    target: String,
    interval: Duration,
    tx: mpsc::Sender<bool>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let timeout = interval.min(Duration::from_secs(2));
    tokio::spawn(async move {
        loop {
            let reachable = tokio::select! {
                _ = cancel.cancelled() => return,
                reachable = probe(&target, timeout) => reachable,
            };
            if tx.send(reachable).await.is_err() {
                return;
            }
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(interval) => {}
            }
        }
    })
}
