// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! herald-core: pure logic for the group announcement relay
//!
//! This crate provides:
//! - The connection state machine and its snapshot type
//! - The bounded reconnect policy
//! - Outbound message validation and the canonical announcement
//! - The weekly announcement schedule
//! - Configuration

pub mod clock;
pub mod config;
pub mod connection;
pub mod effect;
pub mod message;
pub mod pairing;
pub mod reconnect;
pub mod schedule;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{AnnouncementConfig, ConfigError, HeraldConfig, HttpConfig, SessionConfig};
pub use connection::{Connection, ConnectionEvent, ConnectionState, GroupSummary, Phase};
pub use effect::Effect;
pub use message::{OutboundMessage, SendError, SendRequest, LESSON_ANNOUNCEMENT};
pub use pairing::{render_qr_data_url, PairingError};
pub use reconnect::{Closure, ReconnectDecision, ReconnectPolicy};
pub use schedule::{ScheduleError, WeeklyRule, WeeklySchedule};
