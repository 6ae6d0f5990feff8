// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded reconnect policy
//!
//! Retries use a flat backoff: every attempt waits the same interval.

use serde::Deserialize;
use std::time::Duration;

/// Default number of automatic retries before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default wait between a closure and the next attempt
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Closure {
    /// Network or transient failure; worth retrying
    Recoverable,
    /// The account logged out; retrying cannot succeed
    Terminal,
}

impl Closure {
    pub fn from_terminal(terminal: bool) -> Self {
        if terminal {
            Closure::Terminal
        } else {
            Closure::Recoverable
        }
    }
}

/// What to do after a closure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Schedule attempt number `attempt` after `delay`
    Retry { attempt: u32, delay: Duration },
    /// Retry budget used up
    Exhausted,
    /// Logged out; never retry
    LoggedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub backoff: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Decide the follow-up to a closure given the retries already spent
    pub fn decide(&self, attempts: u32, closure: Closure) -> ReconnectDecision {
        match closure {
            Closure::Terminal => ReconnectDecision::LoggedOut,
            Closure::Recoverable if attempts < self.max_attempts => ReconnectDecision::Retry {
                attempt: attempts + 1,
                delay: self.backoff,
            },
            Closure::Recoverable => ReconnectDecision::Exhausted,
        }
    }
}

#[cfg(test)]
#[path = "reconnect_tests.rs"]
mod tests;
