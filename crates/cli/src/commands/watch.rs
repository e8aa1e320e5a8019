// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::{runtime, Workspace};
use crate::config::socket_path;
use crate::error::{Error, Result};
use crate::ipc;
use crate::sync::{Notification, Runner};

/// Runs the scheduler loop in the foreground until Ctrl-C.
///
/// `outbox enqueue` from other shells is forwarded here over the watch
/// socket while the loop holds the lock.
pub fn run(start: &Path) -> Result<()> {
    let workspace = Workspace::open_locked(start)?;
    let Some(url) = workspace.config.remote_url() else {
        return Err(Error::NoRemote);
    };
    println!("watching {} (Ctrl-C to stop)", url);

    let rt = runtime()?;
    rt.block_on(async {
        let engine = workspace.engine()?;
        let shutdown = CancellationToken::new();
        let printer = tokio::spawn(print_notifications(engine.subscribe()));

        let signal = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "cannot listen for Ctrl-C");
            }
            signal.cancel();
        });

        let (runner, handle, _connectivity) = Runner::new(engine, workspace.config.runner_config());
        let listener = ipc::bind(&workspace.data_dir)?;
        let server = tokio::spawn(ipc::serve(listener, handle, shutdown.clone()));

        let result = runner.run(shutdown.clone()).await;
        shutdown.cancel();
        let _ = server.await;
        if let Err(e) = std::fs::remove_file(socket_path(&workspace.data_dir)) {
            warn!(error = %e, "cannot remove watch socket");
        }
        let engine = result?;
        let pending = engine.pending().len();
        engine.dispose().await;
        printer.abort();

        if pending > 0 {
            println!("stopped, {} changes still pending", pending);
        } else {
            println!("stopped");
        }
        Ok(())
    })
}

async fn print_notifications(mut rx: broadcast::Receiver<Notification>) {
    loop {
        match rx.recv().await {
            Ok(notification) => println!("{}", notification.message()),
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}
