// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory credential store for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{CredentialError, CredentialStore, Credentials};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MemoryState {
    current: Option<Credentials>,
    saves: usize,
}

/// Credential store that keeps everything in memory
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `credentials`
    pub fn with(credentials: Credentials) -> Self {
        let store = Self::default();
        store.state.lock().unwrap_or_else(|e| e.into_inner()).current = Some(credentials);
        store
    }

    pub fn current(&self) -> Option<Credentials> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .current
            .clone()
    }

    /// Number of successful saves
    pub fn saves(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).saves
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<Credentials>, CredentialError> {
        Ok(self.current())
    }

    async fn save(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.current = Some(credentials.clone());
        state.saves += 1;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CredentialError> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).current = None;
        Ok(())
    }
}
