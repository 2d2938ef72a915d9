// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A clock that provides the current time as epoch seconds.
///
/// All persisted timestamps (job creation, expiration, registry TTL) are
/// integer seconds since epoch; the clock is injected wherever a
/// component needs "now" so tests can control expiry windows.
pub trait Clock: Clone + Send + Sync + 'static {
    fn epoch_secs(&self) -> u64;
}

/// Real system clock
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Fake clock for testing with controllable time
#[derive(Clone)]
pub struct FakeClock {
    epoch: Arc<Mutex<u64>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self { epoch: Arc::new(Mutex::new(1_000_000)) }
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        *self.epoch.lock() += duration.as_secs();
    }

    /// Set the epoch seconds value
    pub fn set_epoch_secs(&self, secs: u64) {
        *self.epoch.lock() = secs;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn epoch_secs(&self) -> u64 {
        *self.epoch.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
