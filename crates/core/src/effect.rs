// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects requested by the connection state machine

use std::time::Duration;

/// Side effects the runtime executes on behalf of a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Begin a session attempt tagged with `generation`
    StartSession { generation: u64 },
    /// End the active session, if any
    EndSession,
    /// Reload the group roster for the session of `generation`
    FetchGroups { generation: u64 },
    /// Fire a retry for `generation` after `delay`
    ScheduleRetry { generation: u64, delay: Duration },
    /// Drop the pending retry timer
    CancelRetry,
}

impl Effect {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Effect::StartSession { .. } => "start_session",
            Effect::EndSession => "end_session",
            Effect::FetchGroups { .. } => "fetch_groups",
            Effect::ScheduleRetry { .. } => "schedule_retry",
            Effect::CancelRetry => "cancel_retry",
        }
    }
}
