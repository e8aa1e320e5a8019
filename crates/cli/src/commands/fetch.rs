// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use outbox_core::EntityType;

use super::{runtime, CliEngine, Workspace};
use crate::error::{Error, Result};

pub fn run(start: &Path, scope: Option<String>, entities: &[EntityType]) -> Result<()> {
    let workspace = Workspace::open_locked(start)?;
    if workspace.config.remote.is_none() {
        return Err(Error::NoRemote);
    }

    let rt = runtime()?;
    rt.block_on(async {
        let mut engine = workspace.engine()?;
        let result = fetch(&workspace, &mut engine, scope, entities).await;
        engine.dispose().await;
        let count = result?;
        println!("fetched {} records", count);
        Ok(())
    })
}

/// Refreshes the requested collections (all of them if none are given).
pub(crate) async fn fetch(
    workspace: &Workspace,
    engine: &mut CliEngine,
    scope: Option<String>,
    entities: &[EntityType],
) -> Result<usize> {
    if !workspace.check_connectivity(engine).await {
        return Err(Error::Offline {
            pending: engine.pending().len(),
        });
    }

    let scope = scope.or_else(|| workspace.config.sync.scope.clone());
    let entity_types = if entities.is_empty() {
        &EntityType::ALL[..]
    } else {
        entities
    };
    engine.refresh(entity_types, scope.as_deref()).await
}

#[cfg(test)]
#[path = "fetch_tests.rs"]
mod tests;
