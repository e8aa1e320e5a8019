// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod enqueue;
pub mod fetch;
pub mod init;
pub mod pending;
pub mod read;
pub mod reset;
pub mod status;
pub mod sync;
#[cfg(test)]
#[path = "mod_tests.rs"]
pub mod testing;
pub mod watch;

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

use outbox_core::FileStorage;
use tracing::debug;

use crate::config::{find_data_dir, lock_path, Config};
use crate::error::{Error, Result};
use crate::sync::{probe, Engine, WebSocketRemote};

/// Engine type used by the CLI.
pub type CliEngine = Engine<FileStorage, WebSocketRemote>;

/// Longest wait for the one-shot reachability probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// An opened `.outbox` directory.
pub struct Workspace {
    pub data_dir: PathBuf,
    pub config: Config,
    _lock: Option<File>,
}

impl Workspace {
    /// Opens the data directory above `start` for reading.
    pub fn open(start: &Path) -> Result<Self> {
        let data_dir = find_data_dir(start)?;
        let config = Config::load(&data_dir)?;
        Ok(Workspace {
            data_dir,
            config,
            _lock: None,
        })
    }

    /// Opens the data directory and takes the single-writer lock.
    ///
    /// The lock is held until the workspace is dropped.
    pub fn open_locked(start: &Path) -> Result<Self> {
        let Workspace {
            data_dir, config, ..
        } = Self::open(start)?;
        let lock = acquire_lock(&data_dir)?;
        Ok(Workspace {
            data_dir,
            config,
            _lock: Some(lock),
        })
    }

    /// Restores the engine from the data directory.
    ///
    /// Without a configured remote the engine never goes online, so its
    /// (empty) URL is never dialed.
    pub fn engine(&self) -> Result<CliEngine> {
        let storage = FileStorage::open(&self.data_dir)?;
        let remote = WebSocketRemote::new(
            self.config.remote_url().unwrap_or_default(),
            self.config
                .remote
                .as_ref()
                .map_or(Duration::from_secs(5), |r| r.request_timeout()),
        );
        Engine::open(storage, remote, self.config.sync_policy())
    }

    /// Probes the remote once and feeds the result to the engine.
    ///
    /// Returns `true` if the remote answered.
    pub async fn check_connectivity(&self, engine: &CliEngine) -> bool {
        let Some(target) = self.config.runner_config().probe_target else {
            return false;
        };
        let online = probe(&target, PROBE_TIMEOUT).await;
        debug!(%target, online, "probed remote");
        engine.set_online(online);
        online
    }
}

/// Takes an exclusive, non-blocking lock on the data directory.
fn acquire_lock(data_dir: &Path) -> Result<File> {
    use fs2::FileExt;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path(data_dir))?;

    file.try_lock_exclusive()
        .map_err(|_| Error::Locked(data_dir.display().to_string()))?;

    Ok(file)
}

/// Builds the runtime for commands that talk to the remote.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(Error::Io)
}
