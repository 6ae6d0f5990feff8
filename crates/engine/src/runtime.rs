// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection runtime
//!
//! A single driver task owns the [`Connection`] record. Operator commands,
//! session events and retry timers all arrive through one inbox, so every
//! mutation is serialized. After each transition the snapshot is published
//! on a watch channel; readers never see a half-applied update.

use crate::executor::Executor;
use herald_adapters::{CredentialStore, SessionClient};
use herald_core::{Connection, ConnectionEvent, ConnectionState, Effect, Phase};
use std::collections::VecDeque;
use tokio::sync::{mpsc, oneshot, watch};

/// Messages accepted by the driver task
pub(crate) enum Input {
    /// Session or timer feedback
    Event(ConnectionEvent),
    /// Operator request; acknowledged with the resulting snapshot
    Command {
        event: ConnectionEvent,
        ack: oneshot::Sender<ConnectionState>,
    },
    Stop,
}

/// Driver that applies events to the connection and executes effects
pub(crate) struct Runtime<S, K> {
    connection: Connection,
    executor: Executor<S, K>,
    state: watch::Sender<ConnectionState>,
    inbox: mpsc::UnboundedReceiver<Input>,
}

impl<S, K> Runtime<S, K>
where
    S: SessionClient,
    K: CredentialStore,
{
    pub(crate) fn new(
        connection: Connection,
        executor: Executor<S, K>,
        state: watch::Sender<ConnectionState>,
        inbox: mpsc::UnboundedReceiver<Input>,
    ) -> Self {
        Self {
            connection,
            executor,
            state,
            inbox,
        }
    }

    /// Process inputs until stopped or every sender is gone
    pub(crate) async fn run(mut self) {
        while let Some(input) = self.inbox.recv().await {
            match input {
                Input::Event(event) => self.handle_event(event).await,
                Input::Command { event, ack } => {
                    self.handle_event(event).await;
                    let _ = ack.send(self.connection.snapshot());
                }
                Input::Stop => break,
            }
        }
        self.executor.shutdown();
        tracing::info!("connection runtime stopped");
    }

    /// Apply an event and everything it feeds back
    async fn handle_event(&mut self, event: ConnectionEvent) {
        let mut pending = VecDeque::from([event]);

        while let Some(event) = pending.pop_front() {
            let name = event.name();
            let current = event
                .generation()
                .map_or(true, |generation| generation == self.connection.generation);
            if !current {
                tracing::debug!(event = name, "ignoring stale event");
                continue;
            }
            let closure = matches!(
                event,
                ConnectionEvent::Closed { .. } | ConnectionEvent::StartFailed { .. }
            );
            if let ConnectionEvent::Closed {
                reason, terminal, ..
            } = &event
            {
                tracing::warn!(reason, terminal, "session closed");
            }

            let before = self.connection.phase;
            let (next, effects) = self.connection.transition(event);
            self.connection = next;

            if self.connection.phase != before {
                tracing::info!(
                    event = name,
                    from = %before,
                    to = %self.connection.phase,
                    generation = self.connection.generation,
                    "connection phase changed"
                );
            } else {
                tracing::debug!(event = name, effects = effects.len(), "event handled");
            }

            let retry = effects.iter().find_map(|effect| match effect {
                Effect::ScheduleRetry { delay, .. } => Some(*delay),
                _ => None,
            });
            match retry {
                Some(delay) => tracing::warn!(
                    attempt = self.connection.attempts,
                    max_attempts = self.connection.policy().max_attempts,
                    delay = ?delay,
                    "reconnect scheduled"
                ),
                None if closure && self.connection.phase == Phase::Disconnected => {
                    tracing::error!(
                        error = self.connection.last_error.as_deref(),
                        "not reconnecting"
                    )
                }
                None => {}
            }
            self.publish();

            for effect in effects {
                if let Some(feedback) = self.executor.execute(effect).await {
                    pending.push_back(feedback);
                }
            }
        }
    }

    fn publish(&self) {
        let snapshot = self.connection.snapshot();
        self.state.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
