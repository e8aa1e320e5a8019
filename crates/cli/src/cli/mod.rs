// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use clap::{Parser, Subcommand, ValueEnum};
use outbox_core::{EntityType, Operation};

/// Parse an entity type (singular or plural).
fn entity_type(s: &str) -> Result<EntityType, String> {
    s.parse().map_err(|e: outbox_core::Error| e.to_string())
}

/// Parse an operation name.
fn operation(s: &str) -> Result<Operation, String> {
    s.parse().map_err(|e: outbox_core::Error| e.to_string())
}

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "outbox")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Offline-first local mutation queue with remote sync")]
#[command(
    long_about = "Offline-first local mutation queue with remote sync.\n\n\
    Writes land in a durable local queue and cache immediately; queued changes are \
    replayed against the remote store whenever it is reachable."
)]
pub struct Cli {
    /// Run as if outbox was started in <path>
    #[arg(short = 'C', long = "directory", global = true, value_name = "path")]
    pub directory: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a .outbox data directory here
    #[command(after_help = "\
Examples:
  outbox init                               Local-only (every sync is offline)
  outbox init --remote ws://localhost:7890  Sync with a remote store
  outbox init --remote ws://h:7890 --scope u1  Only fetch records owned by u1")]
    Init {
        /// WebSocket URL of the remote store
        #[arg(long)]
        remote: Option<String>,

        /// Only fetch records whose owner_id equals this value
        #[arg(long)]
        scope: Option<String>,
    },

    /// Queue a mutation and apply it to the local cache
    #[command(after_help = "\
Examples:
  outbox enqueue note insert '{\"id\":\"n1\",\"title\":\"Groceries\"}'
  outbox enqueue task update '{\"id\":\"t1\",\"done\":true}'
  outbox enqueue contact delete '{\"id\":\"c1\"}'")]
    Enqueue {
        /// Entity type (note, task, contact)
        #[arg(value_parser = entity_type)]
        entity: EntityType,

        /// Operation (insert, update, delete)
        #[arg(value_parser = operation)]
        operation: Operation,

        /// JSON object payload; must carry a string "id"
        json: String,
    },

    /// Show cached records of one entity type
    Read {
        /// Entity type (note, task, contact)
        #[arg(value_parser = entity_type)]
        entity: EntityType,

        /// Output format
        #[arg(long, short, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Show queued mutations in replay order
    Pending {
        /// Output format
        #[arg(long, short, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Refresh the cache from the remote store
    Fetch {
        /// Scope override (defaults to the configured scope)
        #[arg(long)]
        scope: Option<String>,

        /// Entity types to refresh (defaults to all)
        #[arg(value_parser = entity_type)]
        entities: Vec<EntityType>,
    },

    /// Replay queued mutations against the remote store now
    Sync,

    /// Show remote, queue and cache status
    Status,

    /// Clear the queue and/or the cache
    Reset {
        /// Clear only the queue
        #[arg(long)]
        queue: bool,

        /// Clear only the cache
        #[arg(long)]
        cache: bool,
    },

    /// Keep syncing in the foreground until interrupted
    Watch,
}
