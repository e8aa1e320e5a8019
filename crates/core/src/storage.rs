// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable key/value storage for the queue and the snapshot cache.
//!
//! Every write replaces the whole value. [`FileStorage`] writes to a
//! temporary file, fsyncs it and renames it over the target, so a crash
//! leaves either the old value or the new one, never a torn mix.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};

/// Key of the persisted action queue.
pub const QUEUE_KEY: &str = "queue.jsonl";
/// Key of the persisted snapshot cache.
pub const CACHE_KEY: &str = "cache.json";

/// Whole-value durable storage.
pub trait Storage: Send + Sync {
    /// Reads the value stored under `key`, or `None` if nothing was stored.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Durably replaces the value stored under `key`.
    ///
    /// Must not return before the value would survive a process restart.
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn read(&self, key: &str) -> Result<Option<String>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        (**self).write(key, value)
    }
}

/// Storage backed by one file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Opens (and creates if needed) a storage directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(FileStorage { dir })
    }

    /// Returns the directory holding the stored values.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file path used for a key.
    pub fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let target = self.path(key);
        let tmp = self.dir.join(format!(".{key}.tmp"));

        let storage_err = |e: std::io::Error| Error::Storage {
            key: key.to_string(),
            reason: e.to_string(),
        };

        let mut file = File::create(&tmp).map_err(storage_err)?;
        file.write_all(value.as_bytes()).map_err(storage_err)?;
        file.sync_all().map_err(storage_err)?;
        drop(file);
        fs::rename(&tmp, &target).map_err(storage_err)?;

        Ok(())
    }
}

/// In-process storage, for tests and embedders that bring their own
/// persistence.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<BTreeMap<String, String>>,
    fail_writes: AtomicBool,
    fail_keys: Mutex<BTreeSet<String>>,
}

impl MemoryStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes writes to one key fail (or succeed again).
    pub fn set_fail_key(&self, key: &str, fail: bool) {
        let mut keys = self.fail_keys.lock().unwrap_or_else(|e| e.into_inner());
        if fail {
            keys.insert(key.to_string());
        } else {
            keys.remove(key);
        }
    }

    /// Returns a copy of the raw value under `key`.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.raw(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let key_fails = self
            .fail_keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key);
        if key_fails || self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Storage {
                key: key.to_string(),
                reason: "write rejected".to_string(),
            });
        }
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
