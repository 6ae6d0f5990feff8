// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound messages and send-request validation

use thiserror::Error;

/// Canonical weekly lesson announcement
pub const LESSON_ANNOUNCEMENT: &str = "📖 שיעור תורה של הרב אליהו נחמני שליט\"א
🕗 מוצ\"ש וראשון ב-20:30
📍 https://meet.google.com/xyz-xyz-xyz

מוזמנים להצטרף לשיעור המועשר והמחזק 🙏";

/// Errors surfaced to callers of the send path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("not connected to the messaging session")]
    NotConnected,
    #[error("invalid send request: {0}")]
    InvalidRequest(String),
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// A request to post to a group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendRequest {
    pub target_group_id: String,
    pub text: Option<String>,
    pub image: Option<Vec<u8>>,
}

impl SendRequest {
    pub fn text(target_group_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            target_group_id: target_group_id.into(),
            text: Some(text.into()),
            image: None,
        }
    }

    pub fn image(target_group_id: impl Into<String>, image: Vec<u8>, caption: Option<String>) -> Self {
        Self {
            target_group_id: target_group_id.into(),
            text: caption,
            image: Some(image),
        }
    }

    /// Check the request and turn it into a deliverable message
    ///
    /// Empty text and empty image payloads count as absent.
    pub fn validate(self) -> Result<(String, OutboundMessage), SendError> {
        let target = self.target_group_id.trim();
        if target.is_empty() {
            return Err(SendError::InvalidRequest(
                "target group id is empty".to_string(),
            ));
        }

        let text = self.text.filter(|t| !t.is_empty());
        let image = self.image.filter(|i| !i.is_empty());

        let message = match (image, text) {
            (Some(data), caption) => OutboundMessage::Image {
                data,
                caption: caption.unwrap_or_default(),
            },
            (None, Some(body)) => OutboundMessage::Text { body },
            (None, None) => {
                return Err(SendError::InvalidRequest(
                    "message needs text or an image".to_string(),
                ))
            }
        };

        Ok((target.to_string(), message))
    }
}

/// A validated message ready for the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    Text { body: String },
    /// Image with a caption (possibly empty)
    Image { data: Vec<u8>, caption: String },
}

impl OutboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Text { .. } => "text",
            OutboundMessage::Image { .. } => "image",
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
