// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduled announcement trigger
//!
//! Sleeps until the next weekly rule and posts the announcement if the
//! session is open. A fire that finds the session closed is skipped, not
//! queued. Fires missed by more than a minute (host suspended, clock
//! jumped) are dropped.
//!
//! The schedule is in local wall time, which can move against the monotonic
//! timer (DST changes, clock corrections). Sleeps are therefore capped and
//! the wall clock re-read after each one; a fire happens only once the wall
//! clock has actually reached the rule.

use crate::gateway::SendGateway;
use chrono::NaiveDateTime;
use herald_adapters::SessionClient;
use herald_core::{Clock, SendError, WeeklySchedule};
use std::time::Duration;

/// How late a fire may run before it counts as missed
const MISFIRE_GRACE_SECS: i64 = 60;

/// Longest sleep before the wall clock is read again. Shorter than the
/// misfire grace so a forward jump still lands inside it.
const CLOCK_RECHECK: Duration = Duration::from_secs(30);

/// Result of one scheduled fire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FireOutcome {
    Sent,
    /// No target group is configured
    NoTarget,
    NotConnected,
    Failed(SendError),
}

pub struct Announcer<S, C> {
    gateway: SendGateway<S>,
    schedule: WeeklySchedule,
    target_group: Option<String>,
    clock: C,
}

impl<S, C> Announcer<S, C>
where
    S: SessionClient,
    C: Clock,
{
    pub fn new(
        gateway: SendGateway<S>,
        schedule: WeeklySchedule,
        target_group: Option<String>,
        clock: C,
    ) -> Self {
        Self {
            gateway,
            schedule,
            target_group,
            clock,
        }
    }

    /// Attempt one announcement now
    pub async fn fire(&self) -> FireOutcome {
        let Some(target) = self.target_group.as_deref() else {
            tracing::warn!("skipping scheduled announcement: no target group configured");
            return FireOutcome::NoTarget;
        };
        if !self.gateway.is_connected() {
            tracing::warn!(group = target, "skipping scheduled announcement: not connected");
            return FireOutcome::NotConnected;
        }

        match self.gateway.send_announcement(target).await {
            Ok(()) => {
                tracing::info!(group = target, "scheduled announcement sent");
                FireOutcome::Sent
            }
            Err(e) => {
                tracing::error!(group = target, error = %e, "scheduled announcement failed");
                FireOutcome::Failed(e)
            }
        }
    }

    /// Wait between now and the next fire strictly after `cursor`
    pub fn next_fire(&self, cursor: NaiveDateTime) -> (NaiveDateTime, Duration) {
        let next = self.schedule.next_after(cursor);
        let wait = (next - self.clock.local_now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        (next, wait)
    }

    /// Fire on every rule until the task is aborted
    pub async fn run(self) {
        tracing::info!(schedule = %self.schedule, "announcement trigger armed");
        let mut cursor = self.clock.local_now();
        loop {
            let (next, wait) = self.next_fire(cursor);
            tracing::debug!(%next, ?wait, "next announcement");
            let now = self.sleep_until(next).await;

            if (now - next).num_seconds() > MISFIRE_GRACE_SECS {
                tracing::warn!(%next, %now, "dropping missed announcement");
                cursor = now;
                continue;
            }
            cursor = next;
            self.fire().await;
        }
    }

    /// Sleep until the wall clock reads at least `target`; returns that reading
    async fn sleep_until(&self, target: NaiveDateTime) -> NaiveDateTime {
        loop {
            let now = self.clock.local_now();
            if now >= target {
                return now;
            }
            let wait = (target - now)
                .to_std()
                .unwrap_or(Duration::ZERO)
                .min(CLOCK_RECHECK);
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
#[path = "announcer_tests.rs"]
mod tests;
