// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP surface over the session handle and the send gateway

use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use herald_adapters::SessionClient;
use herald_core::{ConnectionState, SendError, SendRequest};
use herald_engine::{RuntimeError, SendGateway, SessionHandle};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Largest accepted request body (multipart image uploads)
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState<S> {
    pub session: SessionHandle,
    pub gateway: SendGateway<S>,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Send(#[from] SendError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("invalid form data: {0}")]
    Multipart(String),
}

impl From<MultipartError> for ServerError {
    fn from(e: MultipartError) -> Self {
        ServerError::Multipart(e.body_text())
    }
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::Send(SendError::InvalidRequest(_)) | ServerError::Multipart(_) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::Send(SendError::NotConnected) | ServerError::Runtime(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ServerError::Send(SendError::SendFailed(_)) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router<S: SessionClient>(state: AppState<S>) -> Router {
    Router::new()
        .route("/api/state", get(get_state::<S>))
        .route("/api/groups", get(get_groups::<S>))
        .route("/api/connect", post(connect::<S>))
        .route("/api/disconnect", post(disconnect::<S>))
        .route("/api/send", post(send::<S>))
        .route("/api/announcement", post(announce::<S>))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

async fn get_state<S>(State(state): State<AppState<S>>) -> Json<ConnectionState> {
    Json(state.session.state())
}

async fn get_groups<S>(State(state): State<AppState<S>>) -> impl IntoResponse {
    Json(json!({ "groups": state.session.state().groups }))
}

async fn connect<S>(
    State(state): State<AppState<S>>,
) -> Result<Json<ConnectionState>, ServerError> {
    Ok(Json(state.session.connect().await?))
}

async fn disconnect<S>(
    State(state): State<AppState<S>>,
) -> Result<Json<ConnectionState>, ServerError> {
    Ok(Json(state.session.disconnect().await?))
}

/// Multipart form: `groupId`, optional `text`, optional `image` file
async fn send<S: SessionClient>(
    State(state): State<AppState<S>>,
    mut form: Multipart,
) -> Result<impl IntoResponse, ServerError> {
    let mut request = SendRequest::default();
    while let Some(field) = form.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "groupId" => request.target_group_id = field.text().await?,
            "text" => request.text = Some(field.text().await?),
            "image" => request.image = Some(field.bytes().await?.to_vec()),
            other => tracing::debug!(field = other, "ignoring form field"),
        }
    }

    let group = request.target_group_id.clone();
    state.gateway.send(request).await?;
    tracing::info!(group = %group, "message sent");
    Ok(Json(json!({ "sent": true })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnouncementBody {
    #[serde(default)]
    group_id: String,
}

async fn announce<S: SessionClient>(
    State(state): State<AppState<S>>,
    Json(body): Json<AnnouncementBody>,
) -> Result<impl IntoResponse, ServerError> {
    state.gateway.send_announcement(&body.group_id).await?;
    tracing::info!(group = %body.group_id, "announcement sent");
    Ok(Json(json!({ "sent": true })))
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
