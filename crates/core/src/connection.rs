// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection state machine
//!
//! Mirrors the external messaging session into one record that observers
//! read as snapshots. Every connect attempt gets a new generation; events and
//! retry timers tagged with an older generation are stale and ignored, so a
//! late retry can never clobber a newer attempt.
//!
//! Transitions are pure: they return the next state and the effects the
//! runtime must execute.

use crate::effect::Effect;
use crate::reconnect::{Closure, ReconnectDecision, ReconnectPolicy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error shown after the account logged out
pub const LOGGED_OUT_MESSAGE: &str = "logged out of the messaging session";

/// Error shown once the retry budget is spent
pub const RECONNECT_EXHAUSTED_MESSAGE: &str = "reconnect attempts exhausted";

/// Name given to groups without a subject
pub const UNNAMED_GROUP: &str = "Unnamed group";

/// A group the session participates in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub id: String,
    pub name: String,
    pub participant_count: u32,
}

impl GroupSummary {
    pub fn new(id: impl Into<String>, subject: &str, participant_count: u32) -> Self {
        let name = if subject.trim().is_empty() {
            UNNAMED_GROUP.to_string()
        } else {
            subject.to_string()
        };
        Self {
            id: id.into(),
            name,
            participant_count,
        }
    }
}

/// Read-only copy of the connection record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
    pub connected: bool,
    pub qr_challenge: Option<String>,
    pub loading: bool,
    pub last_error: Option<String>,
    pub groups: Vec<GroupSummary>,
}

/// Lifecycle phase of the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Explicit disconnect is ending the session
    Closing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Disconnected => write!(f, "disconnected"),
            Phase::Connecting => write!(f, "connecting"),
            Phase::Connected => write!(f, "connected"),
            Phase::Closing => write!(f, "closing"),
        }
    }
}

/// Inputs that can transition the connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Operator asked to connect
    Connect,
    /// Operator asked to disconnect
    Disconnect,
    /// The session finished ending after a disconnect
    SessionEnded,
    /// The session could not be started
    StartFailed { generation: u64, error: String },
    /// A pairing challenge was issued and rendered
    PairingChallenge { generation: u64, image: String },
    /// A pairing challenge could not be rendered
    PairingFailed { generation: u64, error: String },
    Opened { generation: u64 },
    Closed {
        generation: u64,
        reason: String,
        terminal: bool,
    },
    GroupsChanged { generation: u64 },
    GroupsLoaded {
        generation: u64,
        groups: Vec<GroupSummary>,
    },
    GroupsFailed { generation: u64, error: String },
    /// A backoff timer scheduled for `generation` elapsed
    RetryDue { generation: u64 },
}

impl ConnectionEvent {
    /// Generation tag for session-originated events
    pub fn generation(&self) -> Option<u64> {
        match self {
            ConnectionEvent::Connect
            | ConnectionEvent::Disconnect
            | ConnectionEvent::SessionEnded => None,
            ConnectionEvent::StartFailed { generation, .. }
            | ConnectionEvent::PairingChallenge { generation, .. }
            | ConnectionEvent::PairingFailed { generation, .. }
            | ConnectionEvent::Opened { generation }
            | ConnectionEvent::Closed { generation, .. }
            | ConnectionEvent::GroupsChanged { generation }
            | ConnectionEvent::GroupsLoaded { generation, .. }
            | ConnectionEvent::GroupsFailed { generation, .. }
            | ConnectionEvent::RetryDue { generation } => Some(*generation),
        }
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            ConnectionEvent::Connect => "connect",
            ConnectionEvent::Disconnect => "disconnect",
            ConnectionEvent::SessionEnded => "session_ended",
            ConnectionEvent::StartFailed { .. } => "start_failed",
            ConnectionEvent::PairingChallenge { .. } => "pairing_challenge",
            ConnectionEvent::PairingFailed { .. } => "pairing_failed",
            ConnectionEvent::Opened { .. } => "opened",
            ConnectionEvent::Closed { .. } => "closed",
            ConnectionEvent::GroupsChanged { .. } => "groups_changed",
            ConnectionEvent::GroupsLoaded { .. } => "groups_loaded",
            ConnectionEvent::GroupsFailed { .. } => "groups_failed",
            ConnectionEvent::RetryDue { .. } => "retry_due",
        }
    }
}

/// The mirrored connection record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub phase: Phase,
    /// Identifier of the latest connect attempt
    pub generation: u64,
    /// Automatic retries spent since the last successful open
    pub attempts: u32,
    pub qr_challenge: Option<String>,
    pub loading: bool,
    pub last_error: Option<String>,
    pub groups: Vec<GroupSummary>,
    /// A backoff timer for the current generation is armed
    pub retry_pending: bool,
    policy: ReconnectPolicy,
}

impl Connection {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            phase: Phase::Disconnected,
            generation: 0,
            attempts: 0,
            qr_challenge: None,
            loading: false,
            last_error: None,
            groups: Vec::new(),
            retry_pending: false,
            policy,
        }
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    pub fn is_connected(&self) -> bool {
        self.phase == Phase::Connected
    }

    /// Copy of the observable fields
    pub fn snapshot(&self) -> ConnectionState {
        ConnectionState {
            connected: self.is_connected(),
            qr_challenge: self.qr_challenge.clone(),
            loading: self.loading,
            last_error: self.last_error.clone(),
            groups: self.groups.clone(),
        }
    }

    /// Pure state transition returning new state and effects
    pub fn transition(&self, event: ConnectionEvent) -> (Self, Vec<Effect>) {
        if let Some(generation) = event.generation() {
            if generation != self.generation {
                return (self.clone(), vec![]);
            }
        }

        match (self.phase, event) {
            (Phase::Disconnected, ConnectionEvent::Connect) => self.begin_attempt(true),

            // One session at a time; a closing session finishes first
            (_, ConnectionEvent::Connect) => (self.clone(), vec![]),

            (Phase::Closing, ConnectionEvent::Disconnect) => (self.clone(), vec![]),

            (phase, ConnectionEvent::Disconnect) => {
                let mut effects = Vec::new();
                if self.retry_pending {
                    effects.push(Effect::CancelRetry);
                }
                let next_phase = if phase == Phase::Disconnected {
                    Phase::Disconnected
                } else {
                    effects.push(Effect::EndSession);
                    Phase::Closing
                };
                let next = Connection {
                    phase: next_phase,
                    generation: self.generation + 1,
                    attempts: 0,
                    qr_challenge: None,
                    loading: false,
                    last_error: None,
                    groups: Vec::new(),
                    retry_pending: false,
                    policy: self.policy,
                };
                (next, effects)
            }

            (Phase::Closing, ConnectionEvent::SessionEnded) => (
                Connection {
                    phase: Phase::Disconnected,
                    ..self.clone()
                },
                vec![],
            ),

            (Phase::Connecting, ConnectionEvent::PairingChallenge { image, .. }) => (
                Connection {
                    qr_challenge: Some(image),
                    loading: false,
                    ..self.clone()
                },
                vec![],
            ),

            (Phase::Connecting, ConnectionEvent::PairingFailed { error, .. }) => (
                Connection {
                    loading: false,
                    last_error: Some(format!("failed to render pairing code: {}", error)),
                    ..self.clone()
                },
                vec![],
            ),

            (Phase::Connecting, ConnectionEvent::Opened { generation }) => (
                Connection {
                    phase: Phase::Connected,
                    attempts: 0,
                    qr_challenge: None,
                    loading: false,
                    last_error: None,
                    ..self.clone()
                },
                vec![Effect::FetchGroups { generation }],
            ),

            (Phase::Connecting, ConnectionEvent::StartFailed { error, .. }) => self.after_closure(
                Closure::Recoverable,
                Some(format!("failed to start session: {}", error)),
            ),

            (
                Phase::Connecting | Phase::Connected,
                ConnectionEvent::Closed { terminal, .. },
            ) => self.after_closure(Closure::from_terminal(terminal), None),

            (Phase::Connected, ConnectionEvent::GroupsChanged { generation }) => {
                (self.clone(), vec![Effect::FetchGroups { generation }])
            }

            (Phase::Connected, ConnectionEvent::GroupsLoaded { groups, .. }) => (
                Connection {
                    groups,
                    ..self.clone()
                },
                vec![],
            ),

            (Phase::Connected, ConnectionEvent::GroupsFailed { error, .. }) => (
                Connection {
                    last_error: Some(format!("failed to load groups: {}", error)),
                    ..self.clone()
                },
                vec![],
            ),

            (Phase::Disconnected, ConnectionEvent::RetryDue { .. }) if self.retry_pending => {
                self.begin_attempt(false)
            }

            // Invalid transitions are no-ops
            _ => (self.clone(), vec![]),
        }
    }

    /// Start a new attempt; manual attempts refill the retry budget
    fn begin_attempt(&self, manual: bool) -> (Self, Vec<Effect>) {
        let generation = self.generation + 1;
        let mut effects = Vec::new();
        if manual && self.retry_pending {
            effects.push(Effect::CancelRetry);
        }
        effects.push(Effect::StartSession { generation });

        let next = Connection {
            phase: Phase::Connecting,
            generation,
            attempts: if manual { 0 } else { self.attempts },
            qr_challenge: None,
            loading: true,
            last_error: None,
            retry_pending: false,
            ..self.clone()
        };
        (next, effects)
    }

    /// Drop to disconnected and consult the reconnect policy
    fn after_closure(&self, closure: Closure, error: Option<String>) -> (Self, Vec<Effect>) {
        let mut next = Connection {
            phase: Phase::Disconnected,
            qr_challenge: None,
            loading: false,
            ..self.clone()
        };

        let effects = match self.policy.decide(self.attempts, closure) {
            ReconnectDecision::Retry { attempt, delay } => {
                next.attempts = attempt;
                next.retry_pending = true;
                if error.is_some() {
                    next.last_error = error;
                }
                vec![Effect::ScheduleRetry {
                    generation: self.generation,
                    delay,
                }]
            }
            ReconnectDecision::Exhausted => {
                next.last_error = Some(match error {
                    Some(error) => format!("{}: {}", RECONNECT_EXHAUSTED_MESSAGE, error),
                    None => RECONNECT_EXHAUSTED_MESSAGE.to_string(),
                });
                vec![]
            }
            ReconnectDecision::LoggedOut => {
                next.last_error = Some(LOGGED_OUT_MESSAGE.to_string());
                vec![]
            }
        };

        (next, effects)
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::new(ReconnectPolicy::default())
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
