// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! outbox-remote: reference WebSocket remote store for outbox clients.
//!
//! Holds the canonical notes, tasks and contacts collections, persisted to
//! `<data>/remote.json`, and answers `apply`/`fetch_all` requests with the
//! permanent/transient failure classification clients rely on.

mod server;
mod state;

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// outbox-remote: reference remote store
#[derive(Parser, Debug)]
#[command(name = "outbox-remote")]
#[command(about = "Reference WebSocket remote store for outbox clients")]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, default_value = "0.0.0.0:7890")]
    bind: SocketAddr,

    /// Directory holding remote.json
    #[arg(short, long, default_value = ".")]
    data: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting outbox-remote");
    info!("  Bind address: {}", args.bind);
    info!("  Data directory: {}", args.data.display());

    let state = state::ServerState::open(&args.data)?;
    info!("  Records loaded: {}", state.record_count().await);

    server::run(args.bind, state).await?;

    Ok(())
}
