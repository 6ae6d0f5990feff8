// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound send gateway
//!
//! Validates requests and refuses to reach the session while it is not open.
//! Validation runs first, so a malformed request is reported as such even
//! when disconnected.

use herald_adapters::SessionClient;
use herald_core::{ConnectionState, OutboundMessage, SendError, SendRequest};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone)]
pub struct SendGateway<S> {
    client: S,
    state: watch::Receiver<ConnectionState>,
    announcement: Arc<str>,
}

impl<S: SessionClient> SendGateway<S> {
    pub fn new(client: S, state: watch::Receiver<ConnectionState>, announcement: &str) -> Self {
        Self {
            client,
            state,
            announcement: Arc::from(announcement),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    /// Text posted by [`send_announcement`](Self::send_announcement)
    pub fn announcement(&self) -> &str {
        &self.announcement
    }

    /// Post a text and/or image to a group
    pub async fn send(&self, request: SendRequest) -> Result<(), SendError> {
        let (target, message) = request.validate()?;
        self.deliver(&target, &message).await
    }

    /// Post the announcement text to a group
    pub async fn send_announcement(&self, target_group_id: &str) -> Result<(), SendError> {
        self.send(SendRequest::text(target_group_id, self.announcement.as_ref()))
            .await
    }

    async fn deliver(&self, target: &str, message: &OutboundMessage) -> Result<(), SendError> {
        if !self.is_connected() {
            tracing::warn!(group = target, "send refused: not connected");
            return Err(SendError::NotConnected);
        }
        self.client
            .send_message(target, message)
            .await
            .map_err(|e| SendError::SendFailed(e.to_string()))
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
