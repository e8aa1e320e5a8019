// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! outbox - offline-first local mutation synchronization.
//!
//! This crate provides the sync engine behind the `outbox` CLI: mutations
//! are queued durably and applied to a local snapshot cache right away, then
//! replayed against a remote store whenever it is reachable.
//!
//! # Main Components
//!
//! - [`sync::Engine`] - owns the queue, the cache and the remote store
//! - [`sync::run`] - scheduler loop driving an engine from connectivity,
//!   ticks and manual triggers
//! - [`Config`] - project configuration (`.outbox/config.toml`)
//! - [`Error`] - error types for all operations
//!
//! # Embedding
//!
//! ```rust,ignore
//! use outbox::sync::{Engine, SyncPolicy, WebSocketRemote};
//! use outbox_core::{EntityType, FileStorage, Operation};
//!
//! let storage = FileStorage::open(".outbox")?;
//! let remote = WebSocketRemote::new("ws://localhost:7890", Duration::from_secs(5));
//! let mut engine = Engine::open(storage, remote, SyncPolicy::default())?;
//! engine.enqueue(EntityType::Note, Operation::Insert, payload)?;
//! ```

mod cli;
mod commands;
mod ipc;

pub mod config;
pub mod error;
pub mod sync;

pub use cli::{Cli, Command, OutputFormat};
pub use config::{find_data_dir, init_data_dir, Config};
pub use error::{Error, Result};

use std::path::PathBuf;

/// Runs one CLI invocation.
pub fn run(cli: Cli) -> Result<()> {
    let start = match cli.directory {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };

    match cli.command {
        Command::Init { remote, scope } => commands::init::run(&start, remote, scope),
        Command::Enqueue {
            entity,
            operation,
            json,
        } => commands::enqueue::run(&start, entity, operation, &json),
        Command::Read { entity, output } => commands::read::run(&start, entity, output),
        Command::Pending { output } => commands::pending::run(&start, output),
        Command::Fetch { scope, entities } => commands::fetch::run(&start, scope, &entities),
        Command::Sync => commands::sync::run(&start),
        Command::Status => commands::status::run(&start),
        Command::Reset { queue, cache } => commands::reset::run(&start, queue, cache),
        Command::Watch => commands::watch::run(&start),
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
