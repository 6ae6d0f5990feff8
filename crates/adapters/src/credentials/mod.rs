// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential persistence
//!
//! Credentials are opaque to herald: the session client produces them and
//! hands them back on the next start. Stores only need to round-trip JSON.

mod file;
#[cfg(any(test, feature = "test-support"))]
mod memory;

pub use file::FileCredentialStore;
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryCredentialStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Opaque session credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(serde_json::Value);

impl Credentials {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Errors from credential stores
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("corrupt credentials at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Loads and saves session credentials
#[async_trait]
pub trait CredentialStore: Clone + Send + Sync + 'static {
    /// Stored credentials, or `None` if the account was never paired
    async fn load(&self) -> Result<Option<Credentials>, CredentialError>;

    /// Replace the stored credentials
    async fn save(&self, credentials: &Credentials) -> Result<(), CredentialError>;

    /// Forget the stored credentials
    async fn clear(&self) -> Result<(), CredentialError>;
}
