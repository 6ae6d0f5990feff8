// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effect executor

use crate::runtime::Input;
use herald_adapters::{CredentialStore, RemoteGroup, SessionClient, SessionEvent, SessionEvents};
use herald_core::{render_qr_data_url, ConnectionEvent, Effect};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Reason recorded when a session's event stream ends without a close
const STREAM_ENDED: &str = "session event stream ended";

/// Executes effects using the session client and credential store
///
/// Owns the background tasks of the current session: the event forwarder
/// and the pending retry timer. Both feed events back into the runtime inbox.
pub struct Executor<S, K> {
    client: S,
    credentials: K,
    inbox: mpsc::UnboundedSender<Input>,
    session_task: Option<JoinHandle<()>>,
    retry_task: Option<JoinHandle<()>>,
}

impl<S, K> Executor<S, K>
where
    S: SessionClient,
    K: CredentialStore,
{
    pub(crate) fn new(client: S, credentials: K, inbox: mpsc::UnboundedSender<Input>) -> Self {
        Self {
            client,
            credentials,
            inbox,
            session_task: None,
            retry_task: None,
        }
    }

    /// Execute a single effect with tracing
    ///
    /// Returns an optional event that should be fed back into the state machine.
    pub async fn execute(&mut self, effect: Effect) -> Option<ConnectionEvent> {
        let span = tracing::info_span!("effect", effect = effect.name());
        async {
            tracing::debug!(?effect, "executing");
            let start = Instant::now();
            let feedback = self.execute_inner(effect).await;
            tracing::debug!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                feedback = ?feedback.as_ref().map(ConnectionEvent::name),
                "completed"
            );
            feedback
        }
        .instrument(span)
        .await
    }

    async fn execute_inner(&mut self, effect: Effect) -> Option<ConnectionEvent> {
        match effect {
            Effect::StartSession { generation } => {
                self.abort_session();
                let credentials = match self.credentials.load().await {
                    Ok(credentials) => credentials,
                    Err(e) => {
                        tracing::warn!(error = %e, "ignoring unreadable credentials");
                        None
                    }
                };
                match self.client.start(credentials).await {
                    Ok(events) => {
                        let forwarder = forward_session(
                            generation,
                            events,
                            self.credentials.clone(),
                            self.inbox.clone(),
                        );
                        self.session_task = Some(tokio::spawn(forwarder));
                        None
                    }
                    Err(e) => Some(ConnectionEvent::StartFailed {
                        generation,
                        error: e.to_string(),
                    }),
                }
            }

            Effect::EndSession => {
                self.abort_session();
                // TracedSessionClient logs the failure; the session is gone either way
                let _ = self.client.end().await;
                Some(ConnectionEvent::SessionEnded)
            }

            Effect::FetchGroups { generation } => match self.client.fetch_groups().await {
                Ok(groups) => Some(ConnectionEvent::GroupsLoaded {
                    generation,
                    groups: groups.into_iter().map(RemoteGroup::summary).collect(),
                }),
                Err(e) => Some(ConnectionEvent::GroupsFailed {
                    generation,
                    error: e.to_string(),
                }),
            },

            Effect::ScheduleRetry { generation, delay } => {
                self.abort_retry();
                let inbox = self.inbox.clone();
                self.retry_task = Some(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = inbox.send(Input::Event(ConnectionEvent::RetryDue { generation }));
                }));
                None
            }

            Effect::CancelRetry => {
                self.abort_retry();
                None
            }
        }
    }

    /// Abort every background task
    pub(crate) fn shutdown(&mut self) {
        self.abort_session();
        self.abort_retry();
    }

    fn abort_session(&mut self) {
        if let Some(task) = self.session_task.take() {
            task.abort();
        }
    }

    fn abort_retry(&mut self) {
        if let Some(task) = self.retry_task.take() {
            task.abort();
        }
    }
}

/// Translate one session's events into connection events
async fn forward_session<K: CredentialStore>(
    generation: u64,
    mut events: SessionEvents,
    credentials: K,
    inbox: mpsc::UnboundedSender<Input>,
) {
    while let Some(event) = events.recv().await {
        let feedback = match event {
            SessionEvent::PairingChallenge(raw) => match render_qr_data_url(&raw) {
                Ok(image) => ConnectionEvent::PairingChallenge { generation, image },
                Err(e) => {
                    tracing::error!(generation, error = %e, "failed to render pairing code");
                    ConnectionEvent::PairingFailed {
                        generation,
                        error: e.to_string(),
                    }
                }
            },
            SessionEvent::Open => ConnectionEvent::Opened { generation },
            SessionEvent::GroupsChanged => ConnectionEvent::GroupsChanged { generation },
            SessionEvent::CredentialsUpdated(updated) => {
                match credentials.save(&updated).await {
                    Ok(()) => tracing::debug!(generation, "credentials saved"),
                    Err(e) => tracing::error!(generation, error = %e, "failed to save credentials"),
                }
                continue;
            }
            SessionEvent::Closed { reason, terminal } => {
                if terminal {
                    if let Err(e) = credentials.clear().await {
                        tracing::error!(error = %e, "failed to clear credentials");
                    }
                }
                let _ = inbox.send(Input::Event(ConnectionEvent::Closed {
                    generation,
                    reason,
                    terminal,
                }));
                return;
            }
        };
        if inbox.send(Input::Event(feedback)).is_err() {
            return;
        }
    }

    let _ = inbox.send(Input::Event(ConnectionEvent::Closed {
        generation,
        reason: STREAM_ENDED.to_string(),
        terminal: false,
    }));
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
