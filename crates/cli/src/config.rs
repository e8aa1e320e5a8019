// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Project configuration management.
//!
//! Configuration is stored in `.outbox/config.toml` next to the queue and
//! cache files:
//! - `[remote]`: where the remote store lives and how patiently to talk to it
//! - `[sync]`: retry bound, scheduler timings and the fetch scope

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::sync::{RunnerConfig, SyncPolicy};

const DATA_DIR_NAME: &str = ".outbox";
const CONFIG_FILE_NAME: &str = "config.toml";
const LOCK_FILE_NAME: &str = "lock";
const SOCKET_FILE_NAME: &str = "watch.sock";

/// Project configuration stored in `.outbox/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Remote store connection (absent = local-only, every sync is offline).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,
    /// Sync policy.
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Remote store connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// WebSocket URL (`ws://...` or `wss://...`).
    pub url: String,
    /// Max time to wait for a response to one request (default: 5000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Interval between reachability probes in seconds (default: 5).
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
}

/// Sync policy settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Transient failures tolerated per action before it is dropped (default: 3).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Periodic drain interval in seconds (default: 30).
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    /// Delay between regaining connectivity and draining, in seconds (default: 1).
    #[serde(default = "default_reconnect_debounce_secs")]
    pub reconnect_debounce_secs: u64,
    /// Only fetch records whose scope field equals this value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_probe_interval_secs() -> u64 {
    5
}

fn default_max_retries() -> u32 {
    3
}

fn default_tick_interval_secs() -> u64 {
    30
}

fn default_reconnect_debounce_secs() -> u64 {
    1
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            max_retries: default_max_retries(),
            tick_interval_secs: default_tick_interval_secs(),
            reconnect_debounce_secs: default_reconnect_debounce_secs(),
            scope: None,
        }
    }
}

impl RemoteConfig {
    /// Creates a remote config with default timings.
    pub fn new(url: impl Into<String>) -> Self {
        RemoteConfig {
            url: url.into(),
            request_timeout_ms: default_request_timeout_ms(),
            probe_interval_secs: default_probe_interval_secs(),
        }
    }

    /// Validates that the URL is a WebSocket URL.
    pub fn validate_url(&self) -> Result<()> {
        if self.url.starts_with("ws://") || self.url.starts_with("wss://") {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "invalid remote URL '{}': must be ws:// or wss://",
                self.url
            )))
        }
    }

    /// Returns the per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Config {
    /// Loads configuration from the given `.outbox/` directory.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join(CONFIG_FILE_NAME);
        let content = fs::read_to_string(&config_path)
            .map_err(|e| Error::Config(format!("failed to read config: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        if let Some(remote) = &config.remote {
            remote.validate_url()?;
        }
        Ok(config)
    }

    /// Saves configuration to the given `.outbox/` directory.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let config_path = data_dir.join(CONFIG_FILE_NAME);
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(&config_path, content)?;
        Ok(())
    }

    /// Returns the remote URL if configured.
    pub fn remote_url(&self) -> Option<&str> {
        self.remote.as_ref().map(|r| r.url.as_str())
    }

    /// Builds the drain policy.
    pub fn sync_policy(&self) -> SyncPolicy {
        SyncPolicy {
            max_retries: self.sync.max_retries,
            scope: self.sync.scope.clone(),
        }
    }

    /// Builds the scheduler timings.
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            tick_interval: Duration::from_secs(self.sync.tick_interval_secs),
            reconnect_debounce: Duration::from_secs(self.sync.reconnect_debounce_secs),
            probe_interval: Duration::from_secs(
                self.remote
                    .as_ref()
                    .map_or(default_probe_interval_secs(), |r| r.probe_interval_secs),
            ),
            probe_target: self.remote.as_ref().and_then(|r| probe_target(&r.url)),
        }
    }
}

/// Derives the `host:port` to probe for reachability from a WebSocket URL.
pub fn probe_target(url: &str) -> Option<String> {
    let (rest, default_port) = if let Some(rest) = url.strip_prefix("ws://") {
        (rest, 80)
    } else if let Some(rest) = url.strip_prefix("wss://") {
        (rest, 443)
    } else {
        return None;
    };

    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if authority.is_empty() {
        return None;
    }

    // Bracketed IPv6 literals carry colons of their own
    let has_port = match authority.rfind(']') {
        Some(end) => authority[end..].contains(':'),
        None => authority.contains(':'),
    };

    if has_port {
        Some(authority.to_string())
    } else {
        Some(format!("{authority}:{default_port}"))
    }
}

/// Finds the `.outbox` directory by walking up from `start`.
pub fn find_data_dir(start: &Path) -> Result<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let data_dir = current.join(DATA_DIR_NAME);
        if data_dir.join(CONFIG_FILE_NAME).is_file() {
            return Ok(data_dir);
        }
        if !current.pop() {
            return Err(Error::NotInitialized);
        }
    }
}

/// Initializes a new `.outbox` directory at the given path.
pub fn init_data_dir(path: &Path, config: &Config) -> Result<PathBuf> {
    let data_dir = path.join(DATA_DIR_NAME);

    if data_dir.join(CONFIG_FILE_NAME).exists() {
        return Err(Error::AlreadyInitialized(data_dir.display().to_string()));
    }
    if let Some(remote) = &config.remote {
        remote.validate_url()?;
    }

    fs::create_dir_all(&data_dir)?;
    config.save(&data_dir)?;

    Ok(data_dir)
}

/// Returns the path of the single-writer lock file.
pub fn lock_path(data_dir: &Path) -> PathBuf {
    data_dir.join(LOCK_FILE_NAME)
}

/// Returns the path of the socket a running `watch` takes requests on.
pub fn socket_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SOCKET_FILE_NAME)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
