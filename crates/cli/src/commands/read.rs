// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use outbox_core::entity::{entity_id, ID_FIELD};
use outbox_core::{EntityType, Record};
use serde_json::Value;

use super::Workspace;
use crate::cli::OutputFormat;
use crate::error::Result;

pub fn run(start: &Path, entity: EntityType, output: OutputFormat) -> Result<()> {
    let workspace = Workspace::open(start)?;
    let engine = workspace.engine()?;
    let records = engine.read(entity);

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string(&records)?),
        OutputFormat::Text => {
            if records.is_empty() {
                println!("no {} records cached", entity);
            }
            for record in &records {
                println!("{}", format_record(record));
            }
        }
    }
    Ok(())
}

/// Formats a record as `id  key=value key=value`, keys in order.
pub(crate) fn format_record(record: &Record) -> String {
    let fields: Vec<String> = record
        .iter()
        .filter(|(key, _)| key.as_str() != ID_FIELD)
        .map(|(key, value)| match value {
            Value::String(s) => format!("{key}={s}"),
            other => format!("{key}={other}"),
        })
        .collect();

    let id = entity_id(record).unwrap_or("?");
    if fields.is_empty() {
        id.to_string()
    } else {
        format!("{id}  {}", fields.join(" "))
    }
}

#[cfg(test)]
#[path = "read_tests.rs"]
mod tests;
