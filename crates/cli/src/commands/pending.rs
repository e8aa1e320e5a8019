// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use outbox_core::PendingAction;

use super::Workspace;
use crate::cli::OutputFormat;
use crate::error::Result;

pub fn run(start: &Path, output: OutputFormat) -> Result<()> {
    let workspace = Workspace::open(start)?;
    let engine = workspace.engine()?;
    let pending = engine.pending();

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string(pending)?),
        OutputFormat::Text => {
            if pending.is_empty() {
                println!("nothing pending");
            }
            for action in pending {
                println!("{}", format_action(action));
            }
        }
    }
    Ok(())
}

pub(crate) fn format_action(action: &PendingAction) -> String {
    let mut line = format!(
        "{}  {} {} {}",
        action.id,
        action.operation,
        action.entity_type,
        action.entity_id()
    );
    if action.retry_count > 0 {
        line.push_str(&format!("  (retried {}x)", action.retry_count));
    }
    line
}

#[cfg(test)]
#[path = "pending_tests.rs"]
mod tests;
