// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::sync::RemoteError;

/// All possible errors that can occur in the outbox library.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not initialized: run 'outbox init' first")]
    NotInitialized,

    #[error("already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("no remote configured\n  hint: run 'outbox init --remote ws://host:port' or edit .outbox/config.toml")]
    NoRemote,

    #[error("offline, {pending} changes saved locally")]
    Offline { pending: usize },

    #[error("another outbox process is using {0}")]
    Locked(String),

    #[error("sync loop is not running")]
    RunnerStopped,

    #[error("outbox watch refused the request: {0}")]
    Watcher(String),

    #[error("invalid JSON payload: {0}")]
    InvalidJson(String),

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Core(#[from] outbox_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

/// A specialized Result type for outbox operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
