// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler loop: turns connectivity edges, periodic ticks and manual
//! requests into drain cycles.
//!
//! The loop:
//! 1. Feeds reachability signals into the connectivity monitor
//! 2. On an online edge, waits out the reconnect debounce and drains
//! 3. On each tick, drains if online with a non-empty queue
//! 4. On "sync now", drains immediately
//! 5. Serves enqueue and read requests from [`SyncHandle`]s between cycles
//!
//! While a cycle runs the loop keeps listening: connectivity signals still
//! reach the monitor (so the cycle can stop early), manual syncs are
//! answered with [`SyncOutcome::Coalesced`] and enqueue/read requests are
//! held until the cycle ends.

use std::sync::Arc;
use std::time::Duration;

use outbox_core::{ActionId, EntityType, Operation, Record, Storage};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::connectivity::{spawn_probe, ConnectivityMonitor, Transition};
use super::engine::Engine;
use super::notification::Notification;
use super::processor::{SyncOutcome, SyncStatus, Trigger};
use super::remote::RemoteStore;
use crate::error::{Error, Result};

/// Scheduler timings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Interval of the periodic drain.
    pub tick_interval: Duration,
    /// Delay between an online edge and the drain it triggers.
    pub reconnect_debounce: Duration,
    /// Interval between reachability probes.
    pub probe_interval: Duration,
    /// `host:port` to probe; `None` disables probing.
    pub probe_target: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            tick_interval: Duration::from_secs(30),
            reconnect_debounce: Duration::from_secs(1),
            probe_interval: Duration::from_secs(5),
            probe_target: None,
        }
    }
}

type SyncReply = oneshot::Sender<Result<SyncOutcome>>;

/// A call into the engine owned by a running [`Runner`].
enum Request {
    Sync(SyncReply),
    Enqueue {
        entity_type: EntityType,
        operation: Operation,
        payload: Record,
        reply: oneshot::Sender<Result<ActionId>>,
    },
    Read {
        entity_type: EntityType,
        reply: oneshot::Sender<Vec<Record>>,
    },
}

/// Talks to the engine owned by a running [`Runner`].
#[derive(Clone)]
pub struct SyncHandle {
    tx: mpsc::Sender<Request>,
    status: Arc<SyncStatus>,
}

impl SyncHandle {
    /// Asks for a drain cycle and waits for its outcome.
    ///
    /// Returns `Coalesced` without waiting if a cycle is already running.
    pub async fn sync_now(&self) -> Result<SyncOutcome> {
        if self.status.is_draining() {
            return Ok(SyncOutcome::Coalesced);
        }
        let (reply, rx) = oneshot::channel();
        self.send(Request::Sync(reply)).await?;
        rx.await.map_err(|_| Error::RunnerStopped)?
    }

    /// Queues a mutation on the running engine.
    ///
    /// Waits for the cycle in progress, if any, to finish first.
    pub async fn enqueue(
        &self,
        entity_type: EntityType,
        operation: Operation,
        payload: Record,
    ) -> Result<ActionId> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::Enqueue {
            entity_type,
            operation,
            payload,
            reply,
        })
        .await?;
        rx.await.map_err(|_| Error::RunnerStopped)?
    }

    /// Reads one collection from the running engine's cache.
    pub async fn read(&self, entity_type: EntityType) -> Result<Vec<Record>> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::Read { entity_type, reply }).await?;
        rx.await.map_err(|_| Error::RunnerStopped)
    }

    async fn send(&self, request: Request) -> Result<()> {
        self.tx.send(request).await.map_err(|_| Error::RunnerStopped)
    }
}

/// Owns an engine and drives it until shutdown.
pub struct Runner<S: Storage + Clone, R: RemoteStore> {
    engine: Engine<S, R>,
    config: RunnerConfig,
    connectivity_tx: mpsc::Sender<bool>,
    connectivity_rx: mpsc::Receiver<bool>,
    request_rx: mpsc::Receiver<Request>,
}

impl<S: Storage + Clone, R: RemoteStore> Runner<S, R> {
    /// Creates a runner.
    ///
    /// Returns the runner, a handle into its engine and the sender that
    /// feeds connectivity signals (`true` = reachable).
    pub fn new(
        engine: Engine<S, R>,
        config: RunnerConfig,
    ) -> (Self, SyncHandle, mpsc::Sender<bool>) {
        let (connectivity_tx, connectivity_rx) = mpsc::channel(16);
        let (request_tx, request_rx) = mpsc::channel(16);
        let handle = SyncHandle {
            tx: request_tx,
            status: Arc::clone(engine.sync_status()),
        };
        let runner = Runner {
            engine,
            config,
            connectivity_tx: connectivity_tx.clone(),
            connectivity_rx,
            request_rx,
        };
        (runner, handle, connectivity_tx)
    }

    /// Runs until `shutdown` fires, then hands the engine back.
    ///
    /// Probes `probe_target` for reachability when one is configured. A
    /// cycle in progress when shutdown fires is allowed to finish. Storage
    /// failures during a cycle stop the loop and are returned.
    pub async fn run(self, shutdown: CancellationToken) -> Result<Engine<S, R>> {
        let Runner {
            mut engine,
            config,
            connectivity_tx,
            mut connectivity_rx,
            mut request_rx,
        } = self;

        let probe_cancel = shutdown.child_token();
        let _probe_guard = probe_cancel.clone().drop_guard();
        if let Some(target) = config.probe_target.clone() {
            let _probe = spawn_probe(target, config.probe_interval, connectivity_tx, probe_cancel);
        }

        let monitor = Arc::clone(engine.connectivity());
        let status = Arc::clone(engine.sync_status());
        let notifier = engine.notifier();
        let signals = Signals {
            monitor: &monitor,
            status: &status,
            notifier: &notifier,
            debounce: config.reconnect_debounce,
        };

        let mut tick =
            tokio::time::interval_at(Instant::now() + config.tick_interval, config.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut debounce: Option<Instant> = None;

        loop {
            let (trigger, reply) = tokio::select! {
                _ = shutdown.cancelled() => break,

                Some(online) = connectivity_rx.recv() => {
                    signals.observe(online, &mut debounce);
                    continue;
                }

                _ = sleep_or_pending(debounce) => {
                    debounce = None;
                    if !monitor.is_online() {
                        continue;
                    }
                    (Trigger::Reconnected, None)
                }

                _ = tick.tick() => {
                    if !monitor.is_online() || engine.pending().is_empty() {
                        continue;
                    }
                    (Trigger::Tick, None)
                }

                Some(request) = request_rx.recv() => {
                    let Some(reply) = serve_local(&mut engine, request) else {
                        continue;
                    };
                    if !monitor.is_online() {
                        status.mark_waiting();
                        let _ = reply.send(Ok(SyncOutcome::Offline {
                            pending: engine.pending().len(),
                        }));
                        continue;
                    }
                    (Trigger::Manual, Some(reply))
                }
            };

            debug!(?trigger, "drain triggered");
            let mut stopping = false;
            let mut deferred = Vec::new();
            let result = {
                let cycle = engine.drain_cycle(trigger);
                tokio::pin!(cycle);
                loop {
                    tokio::select! {
                        result = &mut cycle => break result,

                        Some(online) = connectivity_rx.recv() => {
                            signals.observe(online, &mut debounce);
                        }

                        Some(request) = request_rx.recv() => match request {
                            Request::Sync(extra) => {
                                let _ = extra.send(Ok(SyncOutcome::Coalesced));
                            }
                            other => deferred.push(other),
                        },

                        _ = shutdown.cancelled(), if !stopping => {
                            stopping = true;
                        }
                    }
                }
            };

            match result {
                Ok(outcome) => {
                    if let Some(reply) = reply {
                        let _ = reply.send(Ok(outcome));
                    }
                }
                Err(e) => {
                    error!(error = %e, "drain cycle failed, stopping");
                    return Err(e);
                }
            }

            for request in deferred {
                if let Some(extra) = serve_local(&mut engine, request) {
                    let _ = extra.send(Ok(SyncOutcome::Coalesced));
                }
            }

            if stopping {
                break;
            }
        }

        info!(pending = engine.pending().len(), "sync loop stopped");
        Ok(engine)
    }
}

/// Runs the scheduler loop with a reachability probe until `shutdown` fires.
///
/// Without a probe target the engine never comes online and only ticks
/// are observed.
pub async fn run<S, R>(
    engine: Engine<S, R>,
    config: RunnerConfig,
    shutdown: CancellationToken,
) -> Result<Engine<S, R>>
where
    S: Storage + Clone,
    R: RemoteStore,
{
    let (runner, _handle, _connectivity_tx) = Runner::new(engine, config);
    runner.run(shutdown).await
}

/// Answers requests that only touch local state. Hands a sync request's
/// reply back to the caller.
fn serve_local<S, R>(engine: &mut Engine<S, R>, request: Request) -> Option<SyncReply>
where
    S: Storage + Clone,
    R: RemoteStore,
{
    match request {
        Request::Sync(reply) => Some(reply),
        Request::Enqueue {
            entity_type,
            operation,
            payload,
            reply,
        } => {
            let _ = reply.send(engine.enqueue(entity_type, operation, payload));
            None
        }
        Request::Read { entity_type, reply } => {
            let _ = reply.send(engine.read(entity_type));
            None
        }
    }
}

/// Connectivity edge handling shared by the idle and draining phases.
struct Signals<'a> {
    monitor: &'a ConnectivityMonitor,
    status: &'a SyncStatus,
    notifier: &'a broadcast::Sender<Notification>,
    debounce: Duration,
}

impl Signals<'_> {
    fn observe(&self, online: bool, debounce: &mut Option<Instant>) {
        match self.monitor.observe(online) {
            Some(Transition::Online) => {
                info!("connectivity restored");
                *debounce = Some(Instant::now() + self.debounce);
                let _ = self
                    .notifier
                    .send(Notification::ConnectivityChanged { online: true });
            }
            Some(Transition::Offline) => {
                info!("connectivity lost");
                *debounce = None;
                self.status.mark_waiting();
                let _ = self
                    .notifier
                    .send(Notification::ConnectivityChanged { online: false });
            }
            None => {}
        }
    }
}

async fn sleep_or_pending(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
