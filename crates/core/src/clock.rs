// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Monotonic enqueue stamps.
//!
//! A [`Stamp`] combines wall clock time with a logical counter so that every
//! action enqueued by this client gets a strictly increasing position, even
//! when the wall clock stalls or jumps backwards.
//!
//! Displayed as `{wall_ms}-{counter}`, which feeds action id hashing.
//!
//! Ordering rules:
//! 1. Higher wall_ms wins
//! 2. If wall_ms equal, higher counter wins

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// A monotonic enqueue timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stamp {
    /// Wall clock time in milliseconds since Unix epoch.
    pub wall_ms: u64,
    /// Logical counter for ordering events at the same wall time.
    pub counter: u32,
}

impl Stamp {
    /// Creates a new stamp with the given components.
    pub fn new(wall_ms: u64, counter: u32) -> Self {
        Stamp { wall_ms, counter }
    }

    /// The earliest possible stamp.
    pub fn min() -> Self {
        Stamp {
            wall_ms: 0,
            counter: 0,
        }
    }
}

impl Ord for Stamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.wall_ms
            .cmp(&other.wall_ms)
            .then_with(|| self.counter.cmp(&other.counter))
    }
}

impl PartialOrd for Stamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.wall_ms, self.counter)
    }
}

/// Trait for getting the current wall clock time.
///
/// This allows injecting a mock clock for testing.
pub trait ClockSource: Send + Sync {
    /// Returns the current time in milliseconds since Unix epoch.
    fn now_ms(&self) -> u64;
}

/// System clock implementation using `std::time::SystemTime`.
#[derive(Debug, Default)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

impl<C: ClockSource> ClockSource for &C {
    fn now_ms(&self) -> u64 {
        (*self).now_ms()
    }
}

impl<C: ClockSource + ?Sized> ClockSource for std::sync::Arc<C> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Generates strictly increasing [`Stamp`]s.
pub struct StampClock<C: ClockSource = SystemClock> {
    clock: C,
    last: Mutex<Stamp>,
}

impl<C: ClockSource> StampClock<C> {
    /// Creates a stamp clock with a custom clock source.
    pub fn with_clock(clock: C) -> Self {
        StampClock {
            clock,
            last: Mutex::new(Stamp::min()),
        }
    }

    /// Generates a new stamp, strictly greater than every stamp generated
    /// or observed before.
    pub fn now(&self) -> Stamp {
        let physical = self.clock.now_ms();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());

        let next = if physical > last.wall_ms {
            Stamp::new(physical, 0)
        } else {
            // Clock went backwards or stayed the same
            Stamp::new(last.wall_ms, last.counter.saturating_add(1))
        };

        *last = next;
        next
    }

    /// Advances the clock past a stamp that was produced elsewhere (for
    /// example by a previous process and restored from storage).
    pub fn observe(&self, seen: &Stamp) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if *seen > *last {
            *last = *seen;
        }
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
