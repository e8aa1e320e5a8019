// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use outbox_core::entity::payload_from_value;
use outbox_core::{ActionId, EntityType, Operation, Record};
use tracing::debug;

use super::Workspace;
use crate::config::find_data_dir;
use crate::error::{Error, Result};
use crate::ipc::WatchClient;

pub fn run(start: &Path, entity: EntityType, operation: Operation, json: &str) -> Result<()> {
    let payload = parse_payload(entity, operation, json)?;
    let id = enqueue(start, entity, operation, payload)?;
    println!("{}", id);
    Ok(())
}

/// Queues a mutation in the project above `start`.
///
/// While `outbox watch` holds the project lock the mutation is handed to
/// it instead.
fn enqueue(
    start: &Path,
    entity: EntityType,
    operation: Operation,
    payload: Record,
) -> Result<ActionId> {
    match Workspace::open_locked(start) {
        Ok(workspace) => workspace.engine()?.enqueue(entity, operation, payload),
        Err(Error::Locked(held)) => {
            let data_dir = find_data_dir(start)?;
            let Ok(mut client) = WatchClient::connect(&data_dir) else {
                return Err(Error::Locked(held));
            };
            debug!("forwarding to outbox watch");
            client.enqueue(entity, operation, payload)
        }
        Err(e) => Err(e),
    }
}

/// Parses a JSON payload for `entity` and `operation`.
fn parse_payload(
    entity: EntityType,
    operation: Operation,
    json: &str,
) -> Result<Record> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| Error::InvalidJson(e.to_string()))?;
    Ok(payload_from_value(entity, operation, value)?)
}

#[cfg(test)]
#[path = "enqueue_tests.rs"]
mod tests;
