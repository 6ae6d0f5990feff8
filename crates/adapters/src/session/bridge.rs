// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP bridge session client
//!
//! Talks to a sidecar process that owns the actual messaging connection.
//! Session events are pulled with a long poll on `/session/events` and pushed
//! into the receiver returned by `start`. Each poll asks the bridge to hold
//! for at most `wait` seconds and gets that hold on top of the normal request
//! timeout. A failed poll is reported as a recoverable closure so the
//! reconnect policy takes over.

use super::{RemoteGroup, SessionClient, SessionError, SessionEvent, SessionEvents};
use crate::credentials::Credentials;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use herald_core::OutboundMessage;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Pause between polls that returned nothing
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How long the bridge may hold an event poll open
const DEFAULT_LONG_POLL: Duration = Duration::from_secs(25);

/// Session client backed by the HTTP bridge sidecar
#[derive(Clone)]
pub struct BridgeSessionClient {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
    poll_interval: Duration,
    long_poll: Duration,
    pump: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl BridgeSessionClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, SessionError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SessionError::Request(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
            long_poll: DEFAULT_LONG_POLL,
            pump: Arc::new(Mutex::new(None)),
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Longest hold the bridge is asked for on `/session/events`
    pub fn with_long_poll(mut self, hold: Duration) -> Self {
        self.long_poll = hold;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn stop_pump(&self) {
        if let Some(handle) = self.pump.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl SessionClient for BridgeSessionClient {
    async fn start(&self, credentials: Option<Credentials>) -> Result<SessionEvents, SessionError> {
        self.stop_pump();

        let response = self
            .http
            .post(self.url("/session/start"))
            .json(&StartBody {
                credentials: credentials.as_ref(),
            })
            .send()
            .await?;
        let started: StartResponse = ensure_success(response).await?.json().await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let pump = EventPump {
            http: self.http.clone(),
            url: self.url("/session/events"),
            cursor: started.cursor,
            poll_interval: self.poll_interval,
            hold: self.long_poll,
            timeout: self.long_poll + self.request_timeout,
        };
        *self.pump.lock().unwrap_or_else(|e| e.into_inner()) = Some(tokio::spawn(pump.run(tx)));
        Ok(rx)
    }

    async fn fetch_groups(&self) -> Result<Vec<RemoteGroup>, SessionError> {
        let response = self.http.get(self.url("/groups")).send().await?;
        let body: GroupsResponse = ensure_success(response).await?.json().await?;
        Ok(body
            .groups
            .into_iter()
            .map(|g| RemoteGroup {
                id: g.id,
                subject: g.subject,
                participant_count: g.participants,
            })
            .collect())
    }

    async fn send_message(
        &self,
        target: &str,
        message: &OutboundMessage,
    ) -> Result<(), SessionError> {
        let body = match message {
            OutboundMessage::Text { body } => MessageBody::Text { to: target, text: body },
            OutboundMessage::Image { data, caption } => MessageBody::Image {
                to: target,
                image: STANDARD.encode(data),
                caption,
            },
        };
        let response = self.http.post(self.url("/messages")).json(&body).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn end(&self) -> Result<(), SessionError> {
        self.stop_pump();
        let response = self.http.post(self.url("/session/end")).send().await?;
        ensure_success(response).await?;
        Ok(())
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SessionError::Decode(e.to_string())
        } else {
            SessionError::Request(e.to_string())
        }
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, SessionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(SessionError::Rejected {
        status: status.as_u16(),
        message,
    })
}

/// Background task forwarding bridge events for one session
struct EventPump {
    http: reqwest::Client,
    url: String,
    cursor: u64,
    poll_interval: Duration,
    hold: Duration,
    /// Per-poll timeout; replaces the client-wide request timeout
    timeout: Duration,
}

impl EventPump {
    async fn run(mut self, tx: mpsc::UnboundedSender<SessionEvent>) {
        loop {
            if tx.is_closed() {
                return;
            }
            let events = match self.poll().await {
                Ok(events) => events,
                Err(e) => {
                    tracing::warn!(error = %e, "bridge event poll failed");
                    let _ = tx.send(SessionEvent::Closed {
                        reason: e.to_string(),
                        terminal: false,
                    });
                    return;
                }
            };

            if events.is_empty() {
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }

            for wire in events {
                self.cursor = self.cursor.max(wire.seq);
                let event = wire.kind.into_event();
                let closed = matches!(event, SessionEvent::Closed { .. });
                if tx.send(event).is_err() || closed {
                    return;
                }
            }
        }
    }

    async fn poll(&self) -> Result<Vec<WireEvent>, SessionError> {
        let response = self
            .http
            .get(&self.url)
            .query(&[("after", self.cursor), ("wait", self.hold.as_secs())])
            .timeout(self.timeout)
            .send()
            .await?;
        let body: EventsResponse = ensure_success(response).await?.json().await?;
        Ok(body.events)
    }
}

#[derive(Serialize)]
struct StartBody<'a> {
    credentials: Option<&'a Credentials>,
}

#[derive(Deserialize)]
struct StartResponse {
    /// Sequence number to poll after; skips events of earlier sessions
    #[serde(default)]
    cursor: u64,
}

#[derive(Deserialize)]
struct EventsResponse {
    #[serde(default)]
    events: Vec<WireEvent>,
}

#[derive(Deserialize)]
struct WireEvent {
    seq: u64,
    #[serde(flatten)]
    kind: WireEventKind,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEventKind {
    Qr {
        code: String,
    },
    Open,
    Close {
        #[serde(default)]
        reason: String,
        #[serde(default)]
        logged_out: bool,
    },
    GroupsUpdate,
    Credentials {
        credentials: Credentials,
    },
}

impl WireEventKind {
    fn into_event(self) -> SessionEvent {
        match self {
            WireEventKind::Qr { code } => SessionEvent::PairingChallenge(code),
            WireEventKind::Open => SessionEvent::Open,
            WireEventKind::Close { reason, logged_out } => SessionEvent::Closed {
                reason,
                terminal: logged_out,
            },
            WireEventKind::GroupsUpdate => SessionEvent::GroupsChanged,
            WireEventKind::Credentials { credentials } => {
                SessionEvent::CredentialsUpdated(credentials)
            }
        }
    }
}

#[derive(Deserialize)]
struct GroupsResponse {
    groups: Vec<WireGroup>,
}

#[derive(Deserialize)]
struct WireGroup {
    id: String,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    participants: u32,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum MessageBody<'a> {
    Text {
        to: &'a str,
        text: &'a str,
    },
    Image {
        to: &'a str,
        image: String,
        caption: &'a str,
    },
}

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;
