// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The engine facade.
//!
//! An [`Engine`] owns the action queue, the snapshot cache, the remote store
//! and the connectivity monitor, and is the only thing that mutates them.
//! Reads never wait on the network; writes only wait on local storage.

use std::sync::Arc;

use outbox_core::{
    ActionId, ActionQueue, ClockSource, EntityType, Operation, PendingAction, Record,
    SnapshotCache, Storage, SystemClock,
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::connectivity::{ConnectivityMonitor, Transition};
use super::notification::Notification;
use super::processor::{
    CycleReport, SyncOutcome, SyncPolicy, SyncProcessor, SyncState, SyncStatus, Trigger,
};
use super::remote::{RemoteError, RemoteStore};
use crate::error::{Error, Result};

const NOTIFICATION_CAPACITY: usize = 64;

/// Offline-first sync engine.
pub struct Engine<S: Storage + Clone, R: RemoteStore> {
    storage: S,
    clock: Arc<dyn ClockSource>,
    queue: ActionQueue<S>,
    cache: SnapshotCache<S>,
    remote: R,
    monitor: Arc<ConnectivityMonitor>,
    status: Arc<SyncStatus>,
    notifier: broadcast::Sender<Notification>,
    policy: SyncPolicy,
}

impl<S: Storage + Clone, R: RemoteStore> Engine<S, R> {
    /// Creates an engine with an empty queue and cache.
    ///
    /// Nothing is read from or written to `storage` until
    /// [`load_from_storage`](Self::load_from_storage) or the first mutation.
    /// The engine starts offline.
    pub fn create(storage: S, remote: R, policy: SyncPolicy) -> Self {
        Self::create_with_clock(storage, remote, policy, Arc::new(SystemClock))
    }

    /// Like [`create`](Self::create) with a custom clock for action stamps.
    pub fn create_with_clock(
        storage: S,
        remote: R,
        policy: SyncPolicy,
        clock: Arc<dyn ClockSource>,
    ) -> Self {
        let (notifier, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Engine {
            queue: ActionQueue::new(storage.clone(), Arc::clone(&clock)),
            cache: SnapshotCache::new(storage.clone()),
            storage,
            clock,
            remote,
            monitor: Arc::new(ConnectivityMonitor::new(false)),
            status: Arc::new(SyncStatus::new()),
            notifier,
            policy,
        }
    }

    /// Creates an engine and restores its queue and cache from storage.
    pub fn open(storage: S, remote: R, policy: SyncPolicy) -> Result<Self> {
        let mut engine = Self::create(storage, remote, policy);
        engine.load_from_storage()?;
        Ok(engine)
    }

    /// Replaces the in-memory queue and cache with the persisted ones.
    pub fn load_from_storage(&mut self) -> Result<()> {
        let queue = ActionQueue::load_with_clock(self.storage.clone(), Arc::clone(&self.clock))?;
        let cache = SnapshotCache::load(self.storage.clone())?;
        self.queue = queue;
        self.cache = cache;
        debug!(pending = self.queue.len(), "engine loaded from storage");
        Ok(())
    }

    /// Closes the remote connection and drops the engine.
    ///
    /// Queued actions stay in storage for the next session.
    pub async fn dispose(mut self) {
        if let Err(e) = self.remote.close().await {
            debug!(error = %e, "closing remote failed");
        }
        info!(pending = self.queue.len(), "engine disposed");
    }

    /// Queues a mutation and patches the cache optimistically.
    ///
    /// The action is durable once this returns. If the cache cannot be
    /// written the action is taken back out of the queue and the error
    /// returned, so a failed call leaves no trace.
    pub fn enqueue(
        &mut self,
        entity_type: EntityType,
        operation: Operation,
        payload: Record,
    ) -> Result<ActionId> {
        let id = self.queue.enqueue(entity_type, operation, payload.clone())?;

        if let Err(e) = self.cache.apply_optimistic(entity_type, operation, &payload) {
            if let Err(undo) = self.queue.remove(&id) {
                warn!(%id, error = %undo, "could not withdraw action after cache failure");
            }
            return Err(e.into());
        }

        Ok(id)
    }

    /// Returns the cached records of one entity type.
    pub fn read(&self, entity_type: EntityType) -> Vec<Record> {
        self.cache.read(entity_type)
    }

    /// Returns one cached record.
    pub fn get(&self, entity_type: EntityType, id: &str) -> Option<&Record> {
        self.cache.get(entity_type, id)
    }

    /// Returns the queued actions in replay order.
    pub fn pending(&self) -> &[PendingAction] {
        self.queue.all()
    }

    /// Returns the snapshot cache.
    pub fn cache(&self) -> &SnapshotCache<S> {
        &self.cache
    }

    /// Refreshes every collection from the remote store.
    ///
    /// Pending actions are re-applied on top of the fetched records.
    /// Returns the number of records cached.
    pub async fn cache_full_snapshot(&mut self, scope: Option<&str>) -> Result<usize> {
        self.refresh(&EntityType::ALL, scope).await
    }

    /// Refreshes the given collections from the remote store.
    pub async fn refresh(
        &mut self,
        entity_types: &[EntityType],
        scope: Option<&str>,
    ) -> Result<usize> {
        if !self.monitor.is_online() {
            return Err(Error::Offline {
                pending: self.queue.len(),
            });
        }

        let mut total = 0;
        for &entity_type in entity_types {
            let records = match self
                .remote
                .fetch_all(entity_type, scope.map(str::to_string))
                .await
            {
                Ok(records) => records,
                Err(e) => {
                    if matches!(e, RemoteError::Unreachable(_)) {
                        self.set_online(false);
                    }
                    return Err(e.into());
                }
            };
            total += self.cache.refresh_rebased(
                entity_type,
                records,
                self.queue.pending_for(entity_type),
            )?;
        }
        Ok(total)
    }

    /// Runs a drain cycle now if online.
    pub async fn sync_now(&mut self) -> Result<SyncOutcome> {
        if !self.monitor.is_online() {
            self.status.mark_waiting();
            return Ok(SyncOutcome::Offline {
                pending: self.queue.len(),
            });
        }
        self.drain_cycle(Trigger::Manual).await
    }

    /// Runs one drain cycle, or reports `Coalesced` if one is running.
    pub async fn drain_cycle(&mut self, trigger: Trigger) -> Result<SyncOutcome> {
        let Some(mut guard) = self.status.try_begin() else {
            debug!(?trigger, "cycle already running, coalescing");
            return Ok(SyncOutcome::Coalesced);
        };

        let report = SyncProcessor {
            queue: &mut self.queue,
            cache: &mut self.cache,
            remote: &mut self.remote,
            monitor: &self.monitor,
            policy: &self.policy,
        }
        .run_cycle(trigger)
        .await?;

        if report.interrupted {
            guard.interrupted();
        }
        drop(guard);

        self.publish(&report);
        Ok(SyncOutcome::Completed(report))
    }

    /// Drops every queued action.
    pub fn clear_queue(&mut self) -> Result<()> {
        self.queue.clear()?;
        Ok(())
    }

    /// Drops the cached snapshot.
    pub fn clear_cache(&mut self) -> Result<()> {
        self.cache.clear()?;
        Ok(())
    }

    /// Drops both the queue and the cache.
    pub fn reset(&mut self) -> Result<()> {
        self.clear_queue()?;
        self.clear_cache()
    }

    /// Subscribes to notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    /// Returns a sender for publishing notifications alongside the engine.
    pub fn notifier(&self) -> broadcast::Sender<Notification> {
        self.notifier.clone()
    }

    /// Returns the connectivity monitor.
    pub fn connectivity(&self) -> &Arc<ConnectivityMonitor> {
        &self.monitor
    }

    /// Feeds a connectivity signal, notifying subscribers on a change.
    pub fn set_online(&self, online: bool) -> Option<Transition> {
        let transition = self.monitor.observe(online);
        if transition.is_some() {
            let _ = self.notifier.send(Notification::ConnectivityChanged { online });
        }
        transition
    }

    /// Returns the drain state.
    pub fn status(&self) -> SyncState {
        self.status.get()
    }

    /// Returns the shared drain status.
    pub fn sync_status(&self) -> &Arc<SyncStatus> {
        &self.status
    }

    /// Returns the drain policy.
    pub fn policy(&self) -> &SyncPolicy {
        &self.policy
    }

    fn publish(&self, report: &CycleReport) {
        // No subscribers is fine
        if report.went_offline {
            let _ = self
                .notifier
                .send(Notification::ConnectivityChanged { online: false });
        }
        for dropped in &report.dropped {
            let _ = self.notifier.send(Notification::ActionDropped {
                id: dropped.action.id.clone(),
                entity_type: dropped.action.entity_type,
                operation: dropped.action.operation,
                entity_id: dropped.action.entity_id().to_string(),
                reason: dropped.reason.clone(),
            });
        }
        let _ = self.notifier.send(Notification::SyncCycle {
            succeeded: report.succeeded,
            permanently_failed: report.permanently_failed,
            still_pending: report.still_pending,
        });
    }
}
