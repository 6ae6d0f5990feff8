// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling
//!
//! The reading is the local wall-clock time the weekly schedule is expressed
//! in. Elapsed-time waits go through tokio's timer instead.

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A clock that provides the current time
pub trait Clock: Clone + Send + Sync + 'static {
    /// Current wall-clock time in the local timezone
    fn local_now(&self) -> NaiveDateTime;
}

/// Real system clock
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn local_now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Fake clock for testing with controllable time
///
/// Starts at the Unix epoch.
#[derive(Clone)]
pub struct FakeClock {
    local: Arc<Mutex<NaiveDateTime>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            local: Arc::new(Mutex::new(DateTime::<Utc>::UNIX_EPOCH.naive_utc())),
        }
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        let mut local = self.local.lock().unwrap_or_else(|e| e.into_inner());
        if let Ok(delta) = chrono::TimeDelta::from_std(duration) {
            *local += delta;
        }
    }

    /// Set the wall-clock reading
    pub fn set_local(&self, at: NaiveDateTime) {
        let mut local = self.local.lock().unwrap_or_else(|e| e.into_inner());
        *local = at;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn local_now(&self) -> NaiveDateTime {
        *self.local.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
