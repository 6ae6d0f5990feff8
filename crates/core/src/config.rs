// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration
//!
//! Loaded from a TOML file. Every section and field is optional; a missing
//! file yields the defaults.

use crate::message::LESSON_ANNOUNCEMENT;
use crate::reconnect::ReconnectPolicy;
use crate::schedule::WeeklySchedule;
use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BRIDGE_URL: &str = "http://127.0.0.1:3001";
pub const DEFAULT_HTTP_PORT: u16 = 3000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeraldConfig {
    pub session: SessionConfig,
    pub reconnect: ReconnectPolicy,
    pub announcement: AnnouncementConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Base URL of the messaging bridge sidecar
    pub bridge_url: String,
    /// Connect as soon as the daemon starts
    pub auto_connect: bool,
    /// Upper bound for a single bridge request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bridge_url: DEFAULT_BRIDGE_URL.to_string(),
            auto_connect: true,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnnouncementConfig {
    /// Group the scheduled announcement goes to. Scheduled fires are skipped
    /// when unset.
    pub target_group: Option<String>,
    pub schedule: WeeklySchedule,
    /// Replaces the built-in lesson announcement
    pub text: Option<String>,
}

impl AnnouncementConfig {
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or(LESSON_ANNOUNCEMENT)
    }

    pub fn target_group(&self) -> Option<&str> {
        self.target_group
            .as_deref()
            .map(str::trim)
            .filter(|group| !group.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub bind: SocketAddr,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_HTTP_PORT)),
        }
    }
}

impl HeraldConfig {
    /// Load from `path`, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let url = self.session.bridge_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "session.bridge_url must be an http(s) URL, got {:?}",
                self.session.bridge_url
            )));
        }
        if self.announcement.text.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "announcement.text must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
