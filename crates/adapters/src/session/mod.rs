// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Messaging session clients

mod bridge;
#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use bridge::BridgeSessionClient;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSessionClient, SessionCall};

use crate::credentials::Credentials;
use async_trait::async_trait;
use herald_core::{GroupSummary, OutboundMessage};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from session operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no active session")]
    NotStarted,
    #[error("bridge request failed: {0}")]
    Request(String),
    #[error("bridge rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid bridge response: {0}")]
    Decode(String),
    #[error("{0}")]
    Failed(String),
}

/// Notifications a running session pushes to herald
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Raw pairing challenge to show to the operator
    PairingChallenge(String),
    Open,
    /// `terminal` is set when the account logged out
    Closed { reason: String, terminal: bool },
    GroupsChanged,
    /// Fresh credentials to persist
    CredentialsUpdated(Credentials),
}

/// Stream of events for one started session; ends when the session does
pub type SessionEvents = mpsc::UnboundedReceiver<SessionEvent>;

/// A group as reported by the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteGroup {
    pub id: String,
    pub subject: Option<String>,
    pub participant_count: u32,
}

impl RemoteGroup {
    pub fn summary(self) -> GroupSummary {
        GroupSummary::new(
            self.id,
            self.subject.as_deref().unwrap_or_default(),
            self.participant_count,
        )
    }
}

/// Client for the external messaging session
#[async_trait]
pub trait SessionClient: Clone + Send + Sync + 'static {
    /// Start a session, resuming from `credentials` when present
    async fn start(&self, credentials: Option<Credentials>) -> Result<SessionEvents, SessionError>;

    async fn fetch_groups(&self) -> Result<Vec<RemoteGroup>, SessionError>;

    async fn send_message(&self, target: &str, message: &OutboundMessage)
        -> Result<(), SessionError>;

    /// End the current session. Ending when nothing runs is not an error.
    async fn end(&self) -> Result<(), SessionError>;
}
