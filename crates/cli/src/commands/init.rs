// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use crate::config::{init_data_dir, Config, RemoteConfig, SyncConfig};
use crate::error::Result;

pub fn run(path: &Path, remote: Option<String>, scope: Option<String>) -> Result<()> {
    let config = build_config(remote, scope);
    let data_dir = init_data_dir(path, &config)?;

    println!("Initialized outbox at {}", data_dir.display());
    match config.remote_url() {
        Some(url) => println!("Remote: {}", url),
        None => println!("Remote: none (changes stay local until one is configured)"),
    }
    if let Some(scope) = &config.sync.scope {
        println!("Scope: {}", scope);
    }

    Ok(())
}

fn build_config(remote: Option<String>, scope: Option<String>) -> Config {
    Config {
        remote: remote.map(RemoteConfig::new),
        sync: SyncConfig {
            scope,
            ..SyncConfig::default()
        },
    }
}

#[cfg(test)]
#[path = "init_tests.rs"]
mod tests;
