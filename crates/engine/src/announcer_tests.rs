// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::NaiveDate;
use herald_adapters::{FakeSessionClient, SessionError};
use herald_core::{ConnectionState, FakeClock, OutboundMessage, LESSON_ANNOUNCEMENT};
use tokio::sync::watch;

/// 2026-01-03 is a Saturday
fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn announcer(
    connected: bool,
    target: Option<&str>,
) -> (Announcer<FakeSessionClient, FakeClock>, FakeSessionClient, FakeClock) {
    let client = FakeSessionClient::new();
    let (_, rx) = watch::channel(ConnectionState {
        connected,
        ..ConnectionState::default()
    });
    let gateway = SendGateway::new(client.clone(), rx, LESSON_ANNOUNCEMENT);
    let clock = FakeClock::new();
    clock.set_local(at(3, 20, 29));
    let announcer = Announcer::new(
        gateway,
        WeeklySchedule::default(),
        target.map(str::to_string),
        clock.clone(),
    );
    (announcer, client, clock)
}

fn announcement() -> OutboundMessage {
    OutboundMessage::Text {
        body: LESSON_ANNOUNCEMENT.to_string(),
    }
}

#[tokio::test]
async fn fire_without_target_is_skipped() {
    let (announcer, client, _) = announcer(true, None);
    assert_eq!(announcer.fire().await, FireOutcome::NoTarget);
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn fire_while_disconnected_is_skipped() {
    let (announcer, client, _) = announcer(false, Some("g1"));
    assert_eq!(announcer.fire().await, FireOutcome::NotConnected);
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn fire_while_connected_sends_announcement() {
    let (announcer, client, _) = announcer(true, Some("g1"));
    assert_eq!(announcer.fire().await, FireOutcome::Sent);
    assert_eq!(client.sent(), vec![("g1".to_string(), announcement())]);
}

#[tokio::test]
async fn fire_reports_send_failure() {
    let (announcer, client, _) = announcer(true, Some("g1"));
    client.fail_sends(Some(SessionError::Failed("timeout".to_string())));
    assert!(matches!(
        announcer.fire().await,
        FireOutcome::Failed(SendError::SendFailed(_))
    ));
}

#[test]
fn next_fire_waits_until_rule() {
    let (announcer, _, clock) = announcer(true, Some("g1"));
    let (next, wait) = announcer.next_fire(clock.local_now());
    assert_eq!(next, at(3, 20, 30));
    assert_eq!(wait, Duration::from_secs(60));
}

#[test]
fn next_fire_never_waits_negative() {
    let (announcer, _, clock) = announcer(true, Some("g1"));
    clock.set_local(at(3, 20, 31));
    let (next, wait) = announcer.next_fire(at(3, 20, 0));
    assert_eq!(next, at(3, 20, 30));
    assert_eq!(wait, Duration::ZERO);
}

/// Move the wall clock and tokio's paused timer forward together
async fn elapse(clock: &FakeClock, total: Duration) {
    let step = Duration::from_secs(10);
    let mut elapsed = Duration::ZERO;
    while elapsed < total {
        clock.advance(step);
        tokio::time::sleep(step).await;
        elapsed += step;
    }
}

/// Like [`elapse`], returning the wall-clock reading when the first send lands
async fn elapse_until_sent(
    clock: &FakeClock,
    client: &FakeSessionClient,
    total: Duration,
) -> Option<NaiveDateTime> {
    let step = Duration::from_secs(10);
    let mut elapsed = Duration::ZERO;
    while elapsed < total {
        clock.advance(step);
        tokio::time::sleep(step).await;
        elapsed += step;
        if !client.sent().is_empty() {
            return Some(clock.local_now());
        }
    }
    None
}

#[tokio::test(start_paused = true)]
async fn run_fires_on_each_rule() {
    let (announcer, client, clock) = announcer(true, Some("g1"));
    let task = tokio::spawn(announcer.run());

    elapse(&clock, Duration::from_secs(120)).await;
    assert_eq!(client.sent().len(), 1);

    elapse(&clock, Duration::from_secs(24 * 3600)).await;
    assert_eq!(client.sent().len(), 2);

    task.abort();
}

#[tokio::test(start_paused = true)]
async fn run_skips_while_disconnected_and_keeps_going() {
    let (announcer, client, clock) = announcer(false, Some("g1"));
    let task = tokio::spawn(announcer.run());

    elapse(&clock, Duration::from_secs(2 * 24 * 3600)).await;
    assert!(client.calls().is_empty());
    assert!(!task.is_finished());

    task.abort();
}

#[tokio::test(start_paused = true)]
async fn run_drops_missed_fire() {
    let (announcer, client, clock) = announcer(true, Some("g1"));
    let task = tokio::spawn(announcer.run());

    tokio::time::sleep(Duration::from_secs(1)).await;
    clock.set_local(at(3, 20, 35));
    elapse(&clock, Duration::from_secs(120)).await;
    assert!(client.calls().is_empty());

    task.abort();
}

#[tokio::test(start_paused = true)]
async fn run_waits_out_a_clock_set_back() {
    let (announcer, client, clock) = announcer(true, Some("g1"));
    let task = tokio::spawn(announcer.run());

    tokio::time::sleep(Duration::from_secs(1)).await;
    clock.set_local(at(3, 19, 29));

    let fired_at = elapse_until_sent(&clock, &client, Duration::from_secs(2 * 3600))
        .await
        .expect("announcement never sent");
    assert!(fired_at >= at(3, 20, 30), "fired early at {fired_at}");
    assert!(fired_at <= at(3, 20, 31), "fired late at {fired_at}");
    assert_eq!(client.sent().len(), 1);

    task.abort();
}

#[tokio::test(start_paused = true)]
async fn run_follows_a_clock_jump_forward() {
    let (announcer, client, clock) = announcer(true, Some("g1"));
    // Sunday 01:00, hours before the Sunday rule
    clock.set_local(at(4, 1, 0));
    let task = tokio::spawn(announcer.run());

    tokio::time::sleep(Duration::from_secs(1)).await;
    // Spring forward: the wall clock skips an hour
    clock.set_local(at(4, 2, 0));

    let fired_at = elapse_until_sent(&clock, &client, Duration::from_secs(20 * 3600))
        .await
        .expect("announcement dropped");
    assert!(fired_at >= at(4, 20, 30), "fired early at {fired_at}");
    assert!(fired_at <= at(4, 20, 31), "fired late at {fired_at}");
    assert_eq!(client.sent(), vec![("g1".to_string(), announcement())]);

    task.abort();
}
