// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Drain cycles.
//!
//! A cycle replays every queued action against the remote store in
//! `enqueued_at` order, one at a time:
//! - success removes the action
//! - a transient failure bumps its retry count, up to the policy bound
//! - a permanent failure (or an exhausted retry budget) drops the action
//!
//! Connectivity is checked before every dispatch; losing it ends the cycle
//! and leaves the rest of the queue untouched. Only one cycle runs at a
//! time, guarded by [`SyncStatus`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use outbox_core::{ActionQueue, EntityType, PendingAction, SnapshotCache, Storage};
use tracing::{debug, info, warn};

use super::connectivity::{ConnectivityMonitor, Transition};
use super::remote::{RemoteError, RemoteStore};
use crate::error::Result;

/// State values for the atomic state field.
const STATE_IDLE: u8 = 0;
const STATE_DRAINING: u8 = 1;
const STATE_WAITING: u8 = 2;

/// Where the drain state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Nothing to do, or waiting for the next trigger.
    Idle,
    /// A cycle is running.
    Draining,
    /// The last cycle was cut short by a connectivity loss.
    WaitingForConnectivity,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncState::Idle => "idle",
            SyncState::Draining => "draining",
            SyncState::WaitingForConnectivity => "waiting for connectivity",
        })
    }
}

/// Drain state shared between the cycle and status readers.
///
/// Uses an atomic for lock-free reads while a cycle holds the engine.
#[derive(Debug, Default)]
pub struct SyncStatus {
    state: AtomicU8,
}

impl SyncStatus {
    /// Creates an idle status.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    pub fn get(&self) -> SyncState {
        match self.state.load(Ordering::Acquire) {
            STATE_DRAINING => SyncState::Draining,
            STATE_WAITING => SyncState::WaitingForConnectivity,
            _ => SyncState::Idle,
        }
    }

    /// Returns `true` while a cycle is running.
    pub fn is_draining(&self) -> bool {
        self.get() == SyncState::Draining
    }

    /// Enters `Draining` unless a cycle is already running.
    ///
    /// The returned guard leaves `Draining` when dropped, even if the cycle
    /// bails out early with an error.
    pub fn try_begin(self: &Arc<Self>) -> Option<SyncGuard> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current == STATE_DRAINING {
                return None;
            }
            match self.state.compare_exchange(
                current,
                STATE_DRAINING,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Some(SyncGuard {
                        status: Arc::clone(self),
                        end_state: STATE_IDLE,
                    })
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Marks the engine as waiting for connectivity, unless a cycle runs.
    pub fn mark_waiting(&self) {
        let _ = self.state.compare_exchange(
            STATE_IDLE,
            STATE_WAITING,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

/// Holds `Draining` for the duration of one cycle.
#[derive(Debug)]
pub struct SyncGuard {
    status: Arc<SyncStatus>,
    end_state: u8,
}

impl SyncGuard {
    /// Ends the cycle in `WaitingForConnectivity` instead of `Idle`.
    pub fn interrupted(&mut self) {
        self.end_state = STATE_WAITING;
    }
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        self.status.state.store(self.end_state, Ordering::Release);
    }
}

/// Tunable drain policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Transient failures tolerated per action before it is dropped.
    pub max_retries: u32,
    /// Scope passed to `fetch_all` when refreshing the cache.
    pub scope: Option<String>,
}

/// Default retry bound.
pub const MAX_RETRIES: u32 = 3;

impl Default for SyncPolicy {
    fn default() -> Self {
        SyncPolicy {
            max_retries: MAX_RETRIES,
            scope: None,
        }
    }
}

/// What started a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Connectivity came back (after the debounce).
    Reconnected,
    /// Periodic tick with a non-empty queue.
    Tick,
    /// Explicit "sync now".
    Manual,
}

/// An action discarded during a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedAction {
    pub action: PendingAction,
    pub reason: String,
}

/// Result of one drain cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    /// Actions the remote confirmed.
    pub succeeded: usize,
    /// Actions dropped as permanently failed.
    pub permanently_failed: usize,
    /// Actions left in the queue after the cycle.
    pub still_pending: usize,
    /// Actions that failed transiently and stay queued.
    pub retried: usize,
    /// Details of every dropped action.
    pub dropped: Vec<DroppedAction>,
    /// The cycle stopped early because connectivity was lost.
    pub interrupted: bool,
    /// The cycle itself detected the connectivity loss.
    pub went_offline: bool,
    /// Entity types refreshed from the remote after the cycle.
    pub refreshed: Vec<EntityType>,
}

/// Outcome of a sync request.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// A cycle ran.
    Completed(CycleReport),
    /// A cycle was already running; this request was folded into it.
    Coalesced,
    /// Offline; nothing was attempted.
    Offline { pending: usize },
}

/// Runs one drain cycle over borrowed engine parts.
pub(crate) struct SyncProcessor<'a, S: Storage, R: RemoteStore> {
    pub queue: &'a mut ActionQueue<S>,
    pub cache: &'a mut SnapshotCache<S>,
    pub remote: &'a mut R,
    pub monitor: &'a ConnectivityMonitor,
    pub policy: &'a SyncPolicy,
}

impl<S: Storage, R: RemoteStore> SyncProcessor<'_, S, R> {
    /// Replays the queue, then refreshes every entity type the cycle touched.
    ///
    /// Only storage failures are returned as errors; remote failures are
    /// classified and recorded in the report.
    pub async fn run_cycle(self, trigger: Trigger) -> Result<CycleReport> {
        let SyncProcessor {
            queue,
            cache,
            remote,
            monitor,
            policy,
        } = self;

        let actions = queue.all().to_vec();
        let mut report = CycleReport::default();
        let mut touched = BTreeSet::new();
        debug!(?trigger, queued = actions.len(), "starting drain cycle");

        for action in actions {
            if !monitor.is_online() {
                debug!(id = %action.id, "offline, stopping cycle");
                report.interrupted = true;
                break;
            }

            let result = remote.apply(&action).await;

            match result {
                Ok(()) => {
                    debug!(id = %action.id, "action applied");
                    queue.remove(&action.id)?;
                    touched.insert(action.entity_type);
                    report.succeeded += 1;
                }
                Err(e) => {
                    if matches!(e, RemoteError::Unreachable(_))
                        && monitor.observe(false) == Some(Transition::Offline)
                    {
                        report.went_offline = true;
                    }

                    if e.is_transient() && action.retry_count < policy.max_retries {
                        let retry_count = queue.requeue_with_incremented_retry(&action.id)?;
                        debug!(id = %action.id, ?retry_count, error = %e, "action will be retried");
                        report.retried += 1;
                    } else {
                        warn!(
                            id = %action.id,
                            entity_type = %action.entity_type,
                            operation = %action.operation,
                            error = %e,
                            "dropping action"
                        );
                        queue.remove(&action.id)?;
                        touched.insert(action.entity_type);
                        report.permanently_failed += 1;
                        report.dropped.push(DroppedAction {
                            action,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        if !monitor.is_online() {
            report.interrupted = true;
        } else {
            for entity_type in touched {
                match remote.fetch_all(entity_type, policy.scope.clone()).await {
                    Ok(records) => {
                        let pending = queue.pending_for(entity_type);
                        cache.refresh_rebased(entity_type, records, pending)?;
                        report.refreshed.push(entity_type);
                    }
                    Err(e) => {
                        warn!(%entity_type, error = %e, "refresh after sync failed");
                        if matches!(e, RemoteError::Unreachable(_)) {
                            if monitor.observe(false) == Some(Transition::Offline) {
                                report.went_offline = true;
                            }
                            report.interrupted = true;
                            break;
                        }
                    }
                }
            }
        }

        report.still_pending = queue.len();
        info!(
            succeeded = report.succeeded,
            permanently_failed = report.permanently_failed,
            still_pending = report.still_pending,
            "drain cycle finished"
        );
        Ok(report)
    }
}
