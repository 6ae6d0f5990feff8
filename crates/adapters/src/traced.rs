// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::credentials::Credentials;
use crate::session::{RemoteGroup, SessionClient, SessionError, SessionEvents};
use async_trait::async_trait;
use herald_core::OutboundMessage;
use std::time::Instant;
use tracing::Instrument;

/// Wrapper that adds tracing to any SessionClient
#[derive(Clone)]
pub struct TracedSessionClient<S> {
    inner: S,
}

impl<S> TracedSessionClient<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: SessionClient> SessionClient for TracedSessionClient<S> {
    async fn start(&self, credentials: Option<Credentials>) -> Result<SessionEvents, SessionError> {
        let span = tracing::info_span!("session.start", resume = credentials.is_some());
        async {
            tracing::info!("starting");
            let start = Instant::now();
            let result = self.inner.start(credentials).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(_) => tracing::info!(elapsed_ms, "session started"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "start failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn fetch_groups(&self) -> Result<Vec<RemoteGroup>, SessionError> {
        let span = tracing::info_span!("session.fetch_groups");
        async {
            let start = Instant::now();
            let result = self.inner.fetch_groups().await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(groups) => tracing::info!(count = groups.len(), elapsed_ms, "groups loaded"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "group fetch failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn send_message(
        &self,
        target: &str,
        message: &OutboundMessage,
    ) -> Result<(), SessionError> {
        let span = tracing::info_span!("session.send", group = target, kind = message.kind());
        async {
            let start = Instant::now();
            let result = self.inner.send_message(target, message).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "message sent"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "send failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn end(&self) -> Result<(), SessionError> {
        let span = tracing::info_span!("session.end");
        async {
            let result = self.inner.end().await;
            // end() failing is often acceptable (bridge already gone)
            match &result {
                Ok(()) => tracing::info!("ended"),
                Err(e) => tracing::warn!(error = %e, "end failed (may be expected)"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
