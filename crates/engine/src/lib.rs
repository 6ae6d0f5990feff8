// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Herald session engine

mod announcer;
mod context;
mod error;
mod executor;
mod gateway;
mod runtime;

pub use announcer::{Announcer, FireOutcome};
pub use context::{ContextConfig, ContextDeps, SessionContext, SessionHandle};
pub use error::RuntimeError;
pub use gateway::SendGateway;
