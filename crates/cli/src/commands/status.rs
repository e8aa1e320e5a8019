// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use outbox_core::EntityType;

use super::{CliEngine, Workspace};
use crate::error::Result;

pub fn run(start: &Path) -> Result<()> {
    let workspace = Workspace::open(start)?;
    let engine = workspace.engine()?;

    for line in status_lines(&workspace, &engine) {
        println!("{}", line);
    }
    Ok(())
}

pub(crate) fn status_lines(workspace: &Workspace, engine: &CliEngine) -> Vec<String> {
    let mut lines = vec![
        format!("data: {}", workspace.data_dir.display()),
        format!("remote: {}", workspace.config.remote_url().unwrap_or("none")),
    ];
    if let Some(scope) = &workspace.config.sync.scope {
        lines.push(format!("scope: {}", scope));
    }

    let pending = engine.pending();
    let retrying = pending.iter().filter(|a| a.retry_count > 0).count();
    if retrying > 0 {
        lines.push(format!("pending: {} ({} retrying)", pending.len(), retrying));
    } else {
        lines.push(format!("pending: {}", pending.len()));
    }

    let cached: Vec<String> = EntityType::ALL
        .iter()
        .map(|&t| format!("{} {}", engine.read(t).len(), t))
        .collect();
    lines.push(format!("cached: {}", cached.join(", ")));

    lines.push(match engine.cache().last_synced_at() {
        Some(at) => format!("last synced: {}", at.to_rfc3339()),
        None => "last synced: never".to_string(),
    });
    lines
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
