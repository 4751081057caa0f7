// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wall-clock access for deadline checks.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;
    fn epoch_ms(&self) -> u64;

    /// Seconds since the epoch, with millisecond precision.
    fn epoch_secs(&self) -> f64 {
        self.epoch_ms() as f64 / 1000.0
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
    }
}

/// Manually advanced clock for deadline tests.
#[derive(Clone)]
pub struct FakeClock {
    state: Arc<Mutex<(Instant, u64)>>,
}

impl FakeClock {
    pub fn at_epoch_ms(ms: u64) -> Self {
        Self { state: Arc::new(Mutex::new((Instant::now(), ms))) }
    }

    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock();
        state.0 += by;
        state.1 += by.as_millis() as u64;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::at_epoch_ms(1_700_000_000_000)
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.state.lock().0
    }

    fn epoch_ms(&self) -> u64 {
        self.state.lock().1
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
