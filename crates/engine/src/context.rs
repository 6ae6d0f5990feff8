// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session context: the constructed owner of one messaging session
//!
//! [`SessionContext::start`] spawns the connection runtime and hands out
//! cheap clones of [`SessionHandle`] and [`SendGateway`] to the HTTP layer
//! and the announcement trigger.

use crate::announcer::Announcer;
use crate::error::RuntimeError;
use crate::executor::Executor;
use crate::gateway::SendGateway;
use crate::runtime::{Input, Runtime};
use herald_adapters::{CredentialStore, SessionClient};
use herald_core::{
    AnnouncementConfig, Clock, Connection, ConnectionEvent, ConnectionState, ReconnectPolicy,
};
use std::sync::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Adapter dependencies of a session context
pub struct ContextDeps<S, K, C> {
    pub client: S,
    pub credentials: K,
    pub clock: C,
}

/// Behavior settings of a session context
#[derive(Debug, Clone, Default)]
pub struct ContextConfig {
    pub reconnect: ReconnectPolicy,
    pub announcement: AnnouncementConfig,
}

/// Operator-facing view of the session
#[derive(Clone)]
pub struct SessionHandle {
    inbox: mpsc::UnboundedSender<Input>,
    state: watch::Receiver<ConnectionState>,
}

impl SessionHandle {
    /// Current snapshot
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every published change
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Begin connecting. A no-op while a session is starting or open.
    pub async fn connect(&self) -> Result<ConnectionState, RuntimeError> {
        self.command(ConnectionEvent::Connect).await
    }

    /// End the session and cancel any pending reconnect
    pub async fn disconnect(&self) -> Result<ConnectionState, RuntimeError> {
        self.command(ConnectionEvent::Disconnect).await
    }

    async fn command(&self, event: ConnectionEvent) -> Result<ConnectionState, RuntimeError> {
        let (ack, done) = oneshot::channel();
        self.inbox
            .send(Input::Command { event, ack })
            .map_err(|_| RuntimeError::Stopped)?;
        done.await.map_err(|_| RuntimeError::Stopped)
    }
}

/// Owner of the connection runtime and the announcement trigger
pub struct SessionContext<S, C> {
    handle: SessionHandle,
    gateway: SendGateway<S>,
    clock: C,
    announcement: AnnouncementConfig,
    runtime: JoinHandle<()>,
    announcer: Mutex<Option<JoinHandle<()>>>,
}

impl<S, C> SessionContext<S, C>
where
    S: SessionClient,
    C: Clock,
{
    /// Spawn the connection runtime. Must be called inside a tokio runtime.
    pub fn start<K: CredentialStore>(deps: ContextDeps<S, K, C>, config: ContextConfig) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let connection = Connection::new(config.reconnect);
        let (state_tx, state_rx) = watch::channel(connection.snapshot());

        let executor = Executor::new(deps.client.clone(), deps.credentials, inbox_tx.clone());
        let runtime = Runtime::new(connection, executor, state_tx, inbox_rx);
        let runtime = tokio::spawn(runtime.run());

        let gateway = SendGateway::new(
            deps.client,
            state_rx.clone(),
            config.announcement.text(),
        );
        tracing::info!(
            max_attempts = config.reconnect.max_attempts,
            backoff = ?config.reconnect.backoff,
            "session context started"
        );

        Self {
            handle: SessionHandle {
                inbox: inbox_tx,
                state: state_rx,
            },
            gateway,
            clock: deps.clock,
            announcement: config.announcement,
            runtime,
            announcer: Mutex::new(None),
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn gateway(&self) -> SendGateway<S> {
        self.gateway.clone()
    }

    /// Arm the weekly announcement trigger
    ///
    /// Returns false if it was already armed; the trigger runs at most once
    /// per context.
    pub fn start_announcer(&self) -> bool {
        let mut slot = self.announcer.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            tracing::debug!("announcement trigger already armed");
            return false;
        }
        if self.announcement.target_group().is_none() {
            tracing::warn!("no announcement target group; scheduled fires will be skipped");
        }
        let announcer = Announcer::new(
            self.gateway.clone(),
            self.announcement.schedule.clone(),
            self.announcement.target_group().map(str::to_string),
            self.clock.clone(),
        );
        *slot = Some(tokio::spawn(announcer.run()));
        true
    }

    /// Stop the trigger and the runtime. The session is left as is; call
    /// [`SessionHandle::disconnect`] first to end it.
    pub async fn stop(self) {
        if let Some(task) = self
            .announcer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            task.abort();
        }
        let _ = self.handle.inbox.send(Input::Stop);
        if let Err(e) = self.runtime.await {
            tracing::error!(error = %e, "connection runtime failed");
        }
        tracing::info!("session context stopped");
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
