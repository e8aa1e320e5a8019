// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! User-facing sync notifications.

use outbox_core::{ActionId, EntityType, Operation};

/// Signals the engine emits about connectivity and sync outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    ConnectivityChanged {
        online: bool,
    },
    SyncCycle {
        succeeded: usize,
        permanently_failed: usize,
        still_pending: usize,
    },
    ActionDropped {
        id: ActionId,
        entity_type: EntityType,
        operation: Operation,
        entity_id: String,
        reason: String,
    },
}

fn changes(n: usize) -> String {
    if n == 1 {
        "1 change".to_string()
    } else {
        format!("{n} changes")
    }
}

impl Notification {
    /// Returns the text to show the user.
    pub fn message(&self) -> String {
        match self {
            Notification::ConnectivityChanged { online: true } => {
                "reconnected, syncing…".to_string()
            }
            Notification::ConnectivityChanged { online: false } => {
                "offline, changes saved locally".to_string()
            }
            Notification::SyncCycle {
                succeeded,
                permanently_failed,
                still_pending,
            } => {
                let mut parts = vec![format!("{} synced", changes(*succeeded))];
                if *permanently_failed > 0 {
                    parts.push(format!(
                        "{} could not be saved and {} discarded",
                        changes(*permanently_failed),
                        if *permanently_failed == 1 { "was" } else { "were" }
                    ));
                }
                if *still_pending > 0 {
                    parts.push(format!("{} still pending", changes(*still_pending)));
                }
                parts.join(", ")
            }
            Notification::ActionDropped {
                entity_type,
                operation,
                entity_id,
                reason,
                ..
            } => format!("discarded {operation} of {entity_type} {entity_id}: {reason}"),
        }
    }
}
