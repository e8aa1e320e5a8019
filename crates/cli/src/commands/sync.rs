// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use tokio::sync::broadcast::error::TryRecvError;

use super::{runtime, CliEngine, Workspace};
use crate::error::{Error, Result};
use crate::sync::SyncOutcome;

pub fn run(start: &Path) -> Result<()> {
    let workspace = Workspace::open_locked(start)?;

    let rt = runtime()?;
    let lines = rt.block_on(async {
        let mut engine = workspace.engine()?;
        let result = sync_once(&workspace, &mut engine).await;
        engine.dispose().await;
        result
    })?;

    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

/// Runs one drain cycle if the remote is reachable.
///
/// Returns the lines to show the user. Being offline is not an error: the
/// queue simply stays as it is.
pub(crate) async fn sync_once(
    workspace: &Workspace,
    engine: &mut CliEngine,
) -> Result<Vec<String>> {
    workspace.check_connectivity(engine).await;

    let mut rx = engine.subscribe();
    let outcome = engine.sync_now().await?;

    let mut lines = Vec::new();
    match outcome {
        SyncOutcome::Offline { pending } => {
            lines.push(Error::Offline { pending }.to_string());
        }
        SyncOutcome::Completed(_) | SyncOutcome::Coalesced => loop {
            match rx.try_recv() {
                Ok(notification) => lines.push(notification.message()),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        },
    }
    Ok(lines)
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
