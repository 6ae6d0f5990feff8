// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use std::time::Duration;

fn connecting() -> Connection {
    let (conn, _) = Connection::default().transition(ConnectionEvent::Connect);
    conn
}

fn connected() -> Connection {
    let conn = connecting();
    let generation = conn.generation;
    let (conn, _) = conn.transition(ConnectionEvent::Opened { generation });
    conn
}

fn closed(conn: &Connection, terminal: bool) -> (Connection, Vec<Effect>) {
    conn.transition(ConnectionEvent::Closed {
        generation: conn.generation,
        reason: "stream errored".to_string(),
        terminal,
    })
}

fn groups() -> Vec<GroupSummary> {
    vec![
        GroupSummary::new("g1@g.us", "Evening class", 41),
        GroupSummary::new("g2@g.us", "", 3),
    ]
}

#[test]
fn new_connection_is_disconnected() {
    let conn = Connection::default();
    assert_eq!(conn.phase, Phase::Disconnected);
    assert_eq!(conn.snapshot(), ConnectionState::default());
}

#[test]
fn connect_starts_session_and_sets_loading() {
    let (conn, effects) = Connection::default().transition(ConnectionEvent::Connect);

    assert_eq!(conn.phase, Phase::Connecting);
    assert!(conn.loading);
    assert_eq!(conn.generation, 1);
    assert_eq!(effects, vec![Effect::StartSession { generation: 1 }]);
}

#[test]
fn connect_while_connecting_is_noop() {
    let conn = connecting();
    let (next, effects) = conn.transition(ConnectionEvent::Connect);

    assert_eq!(next, conn);
    assert!(effects.is_empty());
}

#[test]
fn connect_while_connected_is_noop() {
    let conn = connected();
    let (next, effects) = conn.transition(ConnectionEvent::Connect);

    assert_eq!(next, conn);
    assert!(effects.is_empty());
}

#[test]
fn connect_clears_previous_error_and_challenge() {
    let (conn, _) = closed(&connected(), true);
    assert!(conn.last_error.is_some());

    let (conn, _) = conn.transition(ConnectionEvent::Connect);
    assert!(conn.last_error.is_none());
    assert!(conn.qr_challenge.is_none());
}

#[test]
fn pairing_challenge_stores_image_and_clears_loading() {
    let conn = connecting();
    let (conn, effects) = conn.transition(ConnectionEvent::PairingChallenge {
        generation: conn.generation,
        image: "data:image/svg+xml;base64,AAAA".to_string(),
    });

    assert_eq!(
        conn.qr_challenge.as_deref(),
        Some("data:image/svg+xml;base64,AAAA")
    );
    assert!(!conn.loading);
    assert!(effects.is_empty());
}

#[test]
fn pairing_failure_surfaces_error() {
    let conn = connecting();
    let (conn, _) = conn.transition(ConnectionEvent::PairingFailed {
        generation: conn.generation,
        error: "data too long".to_string(),
    });

    assert!(!conn.loading);
    assert_eq!(
        conn.last_error.as_deref(),
        Some("failed to render pairing code: data too long")
    );
}

#[test]
fn open_clears_challenge_and_fetches_groups() {
    let conn = connecting();
    let generation = conn.generation;
    let (conn, _) = conn.transition(ConnectionEvent::PairingChallenge {
        generation,
        image: "qr".to_string(),
    });
    let (conn, effects) = conn.transition(ConnectionEvent::Opened { generation });

    let snapshot = conn.snapshot();
    assert!(snapshot.connected);
    assert!(snapshot.qr_challenge.is_none());
    assert!(!snapshot.loading);
    assert!(snapshot.last_error.is_none());
    assert_eq!(effects, vec![Effect::FetchGroups { generation }]);
}

#[test]
fn groups_are_replaced_wholesale() {
    let conn = connected();
    let generation = conn.generation;
    let (conn, _) = conn.transition(ConnectionEvent::GroupsLoaded {
        generation,
        groups: groups(),
    });
    assert_eq!(conn.groups.len(), 2);
    assert_eq!(conn.groups[1].name, UNNAMED_GROUP);

    let replacement = vec![GroupSummary::new("g3@g.us", "Sunday", 7)];
    let (conn, _) = conn.transition(ConnectionEvent::GroupsLoaded {
        generation,
        groups: replacement.clone(),
    });
    assert_eq!(conn.groups, replacement);
}

#[test]
fn groups_changed_refetches_only_when_connected() {
    let conn = connected();
    let (_, effects) = conn.transition(ConnectionEvent::GroupsChanged {
        generation: conn.generation,
    });
    assert_eq!(
        effects,
        vec![Effect::FetchGroups {
            generation: conn.generation
        }]
    );

    let conn = connecting();
    let (_, effects) = conn.transition(ConnectionEvent::GroupsChanged {
        generation: conn.generation,
    });
    assert!(effects.is_empty());
}

#[test]
fn groups_failure_sets_error_but_stays_connected() {
    let conn = connected();
    let (conn, _) = conn.transition(ConnectionEvent::GroupsFailed {
        generation: conn.generation,
        error: "timeout".to_string(),
    });
    assert!(conn.is_connected());
    assert_eq!(
        conn.last_error.as_deref(),
        Some("failed to load groups: timeout")
    );
}

#[test]
fn recoverable_close_schedules_retry() {
    let conn = connected();
    let generation = conn.generation;
    let (conn, effects) = closed(&conn, false);

    assert_eq!(conn.phase, Phase::Disconnected);
    assert!(conn.retry_pending);
    assert_eq!(conn.attempts, 1);
    assert!(conn.last_error.is_none());
    assert_eq!(
        effects,
        vec![Effect::ScheduleRetry {
            generation,
            delay: Duration::from_secs(5),
        }]
    );
}

#[test]
fn retry_due_starts_next_generation() {
    let (conn, _) = closed(&connected(), false);
    let (conn, effects) = conn.transition(ConnectionEvent::RetryDue {
        generation: conn.generation,
    });

    assert_eq!(conn.phase, Phase::Connecting);
    assert_eq!(conn.generation, 2);
    assert_eq!(conn.attempts, 1);
    assert!(!conn.retry_pending);
    assert_eq!(effects, vec![Effect::StartSession { generation: 2 }]);
}

#[test]
fn terminal_close_never_retries() {
    let (conn, effects) = closed(&connected(), true);

    assert!(effects.is_empty());
    assert!(!conn.retry_pending);
    assert_eq!(conn.last_error.as_deref(), Some(LOGGED_OUT_MESSAGE));
}

#[test]
fn five_recoverable_closures_exhaust_retries() {
    let mut conn = connecting();
    for attempt in 1..=5 {
        let (next, effects) = closed(&conn, false);
        assert!(
            matches!(effects.as_slice(), [Effect::ScheduleRetry { .. }]),
            "attempt {} should retry",
            attempt
        );
        let (next, _) = next.transition(ConnectionEvent::RetryDue {
            generation: next.generation,
        });
        conn = next;
    }

    let (conn, effects) = closed(&conn, false);
    assert!(effects.is_empty());
    assert!(!conn.retry_pending);
    assert_eq!(conn.last_error.as_deref(), Some(RECONNECT_EXHAUSTED_MESSAGE));
}

#[test]
fn open_resets_attempt_counter() {
    let (conn, _) = closed(&connected(), false);
    let (conn, _) = conn.transition(ConnectionEvent::RetryDue {
        generation: conn.generation,
    });
    assert_eq!(conn.attempts, 1);

    let (conn, _) = conn.transition(ConnectionEvent::Opened {
        generation: conn.generation,
    });
    assert_eq!(conn.attempts, 0);
}

#[test]
fn start_failure_is_retried_with_error_visible() {
    let conn = connecting();
    let (conn, effects) = conn.transition(ConnectionEvent::StartFailed {
        generation: conn.generation,
        error: "connection refused".to_string(),
    });

    assert_eq!(conn.phase, Phase::Disconnected);
    assert!(!conn.loading);
    assert_eq!(
        conn.last_error.as_deref(),
        Some("failed to start session: connection refused")
    );
    assert!(matches!(
        effects.as_slice(),
        [Effect::ScheduleRetry { .. }]
    ));
}

#[test]
fn manual_connect_makes_pending_retry_stale() {
    let (conn, _) = closed(&connected(), false);
    let stale = conn.generation;

    let (conn, effects) = conn.transition(ConnectionEvent::Connect);
    assert_eq!(
        effects,
        vec![
            Effect::CancelRetry,
            Effect::StartSession {
                generation: stale + 1
            }
        ]
    );

    let (next, effects) = conn.transition(ConnectionEvent::RetryDue { generation: stale });
    assert_eq!(next, conn);
    assert!(effects.is_empty());
}

#[test]
fn manual_connect_refills_retry_budget() {
    let mut conn = connecting();
    for _ in 0..5 {
        let (next, _) = closed(&conn, false);
        let (next, _) = next.transition(ConnectionEvent::RetryDue {
            generation: next.generation,
        });
        conn = next;
    }
    let (conn, _) = closed(&conn, false);
    assert!(!conn.retry_pending);

    let (conn, _) = conn.transition(ConnectionEvent::Connect);
    assert_eq!(conn.attempts, 0);
    let (_, effects) = closed(&conn, false);
    assert!(matches!(
        effects.as_slice(),
        [Effect::ScheduleRetry { .. }]
    ));
}

#[test]
fn stale_events_are_ignored() {
    let conn = connected();
    let stale = conn.generation - 1;

    for event in [
        ConnectionEvent::Closed {
            generation: stale,
            reason: "old".to_string(),
            terminal: false,
        },
        ConnectionEvent::PairingChallenge {
            generation: stale,
            image: "old".to_string(),
        },
        ConnectionEvent::GroupsLoaded {
            generation: stale,
            groups: groups(),
        },
    ] {
        let (next, effects) = conn.transition(event);
        assert_eq!(next, conn);
        assert!(effects.is_empty());
    }
}

#[test]
fn disconnect_from_connected_ends_session_and_clears_state() {
    let conn = connected();
    let (conn, _) = conn.transition(ConnectionEvent::GroupsLoaded {
        generation: conn.generation,
        groups: groups(),
    });

    let (conn, effects) = conn.transition(ConnectionEvent::Disconnect);
    assert_eq!(conn.phase, Phase::Closing);
    assert_eq!(effects, vec![Effect::EndSession]);
    assert_eq!(conn.snapshot(), ConnectionState::default());

    let (conn, effects) = conn.transition(ConnectionEvent::SessionEnded);
    assert_eq!(conn.phase, Phase::Disconnected);
    assert!(effects.is_empty());
}

#[test]
fn disconnect_cancels_pending_retry() {
    let (conn, _) = closed(&connected(), false);
    let stale = conn.generation;

    let (conn, effects) = conn.transition(ConnectionEvent::Disconnect);
    assert_eq!(effects, vec![Effect::CancelRetry]);
    assert_eq!(conn.phase, Phase::Disconnected);

    let (_, effects) = conn.transition(ConnectionEvent::RetryDue { generation: stale });
    assert!(effects.is_empty());
}

#[test]
fn close_after_disconnect_does_not_retry() {
    let conn = connected();
    let old = conn.generation;
    let (conn, _) = conn.transition(ConnectionEvent::Disconnect);
    let (conn, _) = conn.transition(ConnectionEvent::SessionEnded);

    let (conn, effects) = conn.transition(ConnectionEvent::Closed {
        generation: old,
        reason: "ended".to_string(),
        terminal: false,
    });
    assert!(effects.is_empty());
    assert!(!conn.retry_pending);
}

#[test]
fn connect_while_closing_is_noop() {
    let (conn, _) = connected().transition(ConnectionEvent::Disconnect);
    let (next, effects) = conn.transition(ConnectionEvent::Connect);
    assert_eq!(next, conn);
    assert!(effects.is_empty());
}

#[test]
fn snapshot_serializes_camel_case() {
    let conn = connected();
    let (conn, _) = conn.transition(ConnectionEvent::GroupsLoaded {
        generation: conn.generation,
        groups: vec![GroupSummary::new("g1@g.us", "Evening class", 41)],
    });

    let json = serde_json::to_value(conn.snapshot()).unwrap();
    assert_eq!(json["connected"], true);
    assert_eq!(json["qrChallenge"], serde_json::Value::Null);
    assert_eq!(json["lastError"], serde_json::Value::Null);
    assert_eq!(json["groups"][0]["participantCount"], 41);
}

fn arb_event() -> impl Strategy<Value = (u8, bool)> {
    (0u8..9, any::<bool>())
}

/// Build an event for the current generation (or a stale one when `stale`)
fn make_event(conn: &Connection, kind: u8, stale: bool) -> ConnectionEvent {
    let generation = if stale {
        conn.generation.saturating_sub(1)
    } else {
        conn.generation
    };
    match kind {
        0 => ConnectionEvent::Connect,
        1 => ConnectionEvent::Disconnect,
        2 => ConnectionEvent::SessionEnded,
        3 => ConnectionEvent::PairingChallenge {
            generation,
            image: "qr".to_string(),
        },
        4 => ConnectionEvent::Opened { generation },
        5 => ConnectionEvent::Closed {
            generation,
            reason: "x".to_string(),
            terminal: stale,
        },
        6 => ConnectionEvent::RetryDue { generation },
        7 => ConnectionEvent::StartFailed {
            generation,
            error: "x".to_string(),
        },
        _ => ConnectionEvent::GroupsChanged { generation },
    }
}

proptest! {
    #[test]
    fn connected_and_challenge_never_coexist(events in proptest::collection::vec(arb_event(), 0..60)) {
        let mut conn = Connection::default();
        for (kind, stale) in events {
            let event = make_event(&conn, kind, stale);
            let (next, _) = conn.transition(event);
            conn = next;

            let snapshot = conn.snapshot();
            prop_assert!(!(snapshot.connected && snapshot.qr_challenge.is_some()));
            prop_assert!(!(snapshot.connected && snapshot.loading));
            prop_assert!(conn.attempts <= conn.policy().max_attempts);
        }
    }
}
