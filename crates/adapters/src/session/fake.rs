// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake session client for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{RemoteGroup, SessionClient, SessionError, SessionEvent, SessionEvents};
use crate::credentials::Credentials;
use async_trait::async_trait;
use herald_core::OutboundMessage;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Recorded session call
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCall {
    Start { credentials: Option<Credentials> },
    FetchGroups,
    SendMessage {
        target: String,
        message: OutboundMessage,
    },
    End,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<SessionCall>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
    groups: Vec<RemoteGroup>,
    start_error: Option<SessionError>,
    groups_error: Option<SessionError>,
    send_error: Option<SessionError>,
}

/// Fake session client for testing
///
/// Each `start` opens a fresh event channel; `emit` pushes into the most
/// recent one.
#[derive(Clone, Default)]
pub struct FakeSessionClient {
    state: Arc<Mutex<FakeState>>,
}

impl FakeSessionClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<SessionCall> {
        self.lock().calls.clone()
    }

    /// Number of `start` calls so far
    pub fn starts(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, SessionCall::Start { .. }))
            .count()
    }

    /// Messages sent so far, in order
    pub fn sent(&self) -> Vec<(String, OutboundMessage)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                SessionCall::SendMessage { target, message } => {
                    Some((target.clone(), message.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Push an event into the current session. Returns false if no session
    /// is listening.
    pub fn emit(&self, event: SessionEvent) -> bool {
        self.lock()
            .events
            .as_ref()
            .is_some_and(|tx| tx.send(event).is_ok())
    }

    /// Groups returned by `fetch_groups`
    pub fn set_groups(&self, groups: Vec<RemoteGroup>) {
        self.lock().groups = groups;
    }

    /// Make the next `start` fail
    pub fn fail_next_start(&self, error: SessionError) {
        self.lock().start_error = Some(error);
    }

    /// Make the next `fetch_groups` fail
    pub fn fail_next_groups(&self, error: SessionError) {
        self.lock().groups_error = Some(error);
    }

    /// Make every `send_message` fail until cleared with `None`
    pub fn fail_sends(&self, error: Option<SessionError>) {
        self.lock().send_error = error;
    }
}

#[async_trait]
impl SessionClient for FakeSessionClient {
    async fn start(&self, credentials: Option<Credentials>) -> Result<SessionEvents, SessionError> {
        let mut state = self.lock();
        state.calls.push(SessionCall::Start { credentials });
        if let Some(error) = state.start_error.take() {
            return Err(error);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        state.events = Some(tx);
        Ok(rx)
    }

    async fn fetch_groups(&self) -> Result<Vec<RemoteGroup>, SessionError> {
        let mut state = self.lock();
        state.calls.push(SessionCall::FetchGroups);
        match state.groups_error.take() {
            Some(error) => Err(error),
            None => Ok(state.groups.clone()),
        }
    }

    async fn send_message(
        &self,
        target: &str,
        message: &OutboundMessage,
    ) -> Result<(), SessionError> {
        let mut state = self.lock();
        state.calls.push(SessionCall::SendMessage {
            target: target.to_string(),
            message: message.clone(),
        });
        match &state.send_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn end(&self) -> Result<(), SessionError> {
        let mut state = self.lock();
        state.calls.push(SessionCall::End);
        state.events = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
