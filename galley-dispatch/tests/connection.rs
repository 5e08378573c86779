//! Connection state machine, heartbeat and reconnect behaviour (virtual time)

mod common;

use std::time::Duration;

use common::{FakeTransport, connection, drain, record_statuses, test_config};
use galley_dispatch::{ConnectionStatus, Notification, TransportError, TransportEvent};
use tokio::time::{Instant, sleep};

use ConnectionStatus::*;

#[tokio::test(start_paused = true)]
async fn test_connect_walks_the_state_machine() {
    let fake = FakeTransport::new();
    let conn = connection(&fake, test_config());
    let (seen, _sub) = record_statuses(&conn);

    assert_eq!(conn.status(), Disconnected);
    assert!(conn.connect().await);

    assert!(conn.is_connected());
    assert_eq!(*seen.lock(), vec![Connecting, Connected]);
}

#[tokio::test(start_paused = true)]
async fn test_connect_is_idempotent() {
    let fake = FakeTransport::new();
    let conn = connection(&fake, test_config());
    let (seen, _sub) = record_statuses(&conn);

    assert!(conn.connect().await);
    assert!(conn.connect().await);

    assert_eq!(fake.open_count(), 1);
    assert_eq!(seen.lock().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_connects_share_one_attempt() {
    let fake = FakeTransport::new();
    fake.set_open_delay(Duration::from_secs(1));
    let conn = connection(&fake, test_config());

    let (a, b, c) = tokio::join!(conn.connect(), conn.connect(), conn.connect());

    assert!(a && b && c);
    assert_eq!(fake.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_is_connected_tracks_latest_transition() {
    let fake = FakeTransport::new();
    let conn = connection(&fake, test_config());

    assert!(conn.connect().await);
    assert!(conn.is_connected());

    conn.disconnect().await;
    assert!(!conn.is_connected());
    assert_eq!(conn.status(), Disconnected);

    assert!(conn.connect().await);
    assert!(conn.is_connected());
    assert_eq!(fake.open_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_supersedes_in_flight_attempt() {
    let fake = FakeTransport::new();
    fake.set_open_delay(Duration::from_secs(1));
    let conn = connection(&fake, test_config());

    let first = tokio::spawn({
        let conn = conn.clone();
        async move { conn.connect().await }
    });
    sleep(Duration::from_millis(100)).await;

    conn.disconnect().await;
    assert!(conn.connect().await);

    assert!(!first.await.unwrap());
    assert!(conn.is_connected());
    assert_eq!(fake.open_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_connect_during_slow_close_ends_on_live_status() {
    let fake = FakeTransport::new();
    fake.set_close_delay(Duration::from_millis(10));
    let conn = connection(&fake, test_config());
    let (seen, _sub) = record_statuses(&conn);

    assert!(conn.connect().await);
    let closing = tokio::spawn({
        let conn = conn.clone();
        async move { conn.disconnect().await }
    });
    while conn.status() != Disconnected {
        tokio::task::yield_now().await;
    }
    assert!(!closing.is_finished());

    assert!(conn.connect().await);
    closing.await.unwrap();

    assert_eq!(conn.status(), Connected);
    assert_eq!(seen.lock().last(), Some(&Connected));
    assert_eq!(
        *seen.lock(),
        vec![Connecting, Connected, Disconnected, Connecting, Connected]
    );
}

#[tokio::test(start_paused = true)]
async fn test_missing_bridge_goes_not_installed_then_recovers() {
    let fake = FakeTransport::absent();
    let conn = connection(&fake, test_config());
    let (seen, _sub) = record_statuses(&conn);
    let mut rx = conn.notifications();

    let started = Instant::now();
    assert!(!conn.connect().await);
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert_eq!(conn.status(), NotInstalled);
    assert_eq!(fake.open_count(), 0);

    let notes = drain(&mut rx);
    assert_eq!(notes[0], Notification::BridgeUnavailable);
    assert!(matches!(notes[1], Notification::ReconnectScheduled { attempt: 1, .. }));

    // Agent starts before the scheduled retry
    fake.set_present(true);
    sleep(Duration::from_secs(2)).await;

    assert!(conn.is_connected());
    assert_eq!(*seen.lock(), vec![NotInstalled, Disconnected, Connecting, Connected]);
}

#[tokio::test(start_paused = true)]
async fn test_bridge_announcement_ends_wait_early() {
    let fake = FakeTransport::absent();
    let config = test_config().with_bridge_wait(Duration::from_secs(60), Duration::from_secs(10));
    let conn = connection(&fake, config);

    let started = Instant::now();
    let pending = tokio::spawn({
        let conn = conn.clone();
        async move { conn.connect().await }
    });

    sleep(Duration::from_secs(1)).await;
    fake.set_present(true);
    conn.bridge_announced();

    assert!(pending.await.unwrap());
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_connect_timeout() {
    let fake = FakeTransport::new();
    fake.set_open_delay(Duration::from_secs(20));
    let conn = connection(&fake, test_config());
    let mut rx = conn.notifications();

    let started = Instant::now();
    assert!(!conn.connect().await);

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(10) && elapsed < Duration::from_secs(11));
    assert_eq!(conn.status(), Error);
    assert_eq!(drain(&mut rx)[0], Notification::ConnectionTimeout);

    conn.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn test_backoff_then_exhaustion() {
    let fake = FakeTransport::new();
    fake.fail_opens(Some(TransportError::Unreachable("refused".into())));
    let conn = connection(&fake, test_config());
    let mut rx = conn.notifications();

    assert!(!conn.connect().await);
    sleep(Duration::from_secs(600)).await;

    // One caller attempt plus five automatic ones
    assert_eq!(fake.open_count(), 6);
    assert_eq!(conn.status(), Error);

    let notes = drain(&mut rx);
    let delays: Vec<Duration> = notes
        .iter()
        .filter_map(|n| match n {
            Notification::ReconnectScheduled { delay, .. } => Some(*delay),
            _ => None,
        })
        .collect();
    assert_eq!(
        delays,
        vec![
            Duration::from_millis(1000),
            Duration::from_millis(1500),
            Duration::from_millis(2250),
            Duration::from_micros(3_375_000),
            Duration::from_micros(5_062_500),
        ]
    );
    assert_eq!(notes.last(), Some(&Notification::ReconnectExhausted { attempts: 5 }));

    // No sixth automatic attempt
    sleep(Duration::from_secs(600)).await;
    assert_eq!(fake.open_count(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_focus_regained_resets_budget() {
    let fake = FakeTransport::new();
    fake.fail_opens(Some(TransportError::Unreachable("refused".into())));
    let conn = connection(&fake, test_config());

    assert!(!conn.connect().await);
    sleep(Duration::from_secs(600)).await;
    assert_eq!(fake.open_count(), 6);

    fake.fail_opens(None);
    assert!(conn.focus_regained().await);
    assert_eq!(fake.open_count(), 7);
    assert_eq!(conn.reconnect_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_then_connect_resumes_after_exhaustion() {
    let fake = FakeTransport::new();
    fake.fail_opens(Some(TransportError::Unreachable("refused".into())));
    let conn = connection(&fake, test_config());

    assert!(!conn.connect().await);
    sleep(Duration::from_secs(600)).await;
    assert_eq!(fake.open_count(), 6);

    conn.disconnect().await;
    assert!(!conn.connect().await);
    assert_eq!(fake.open_count(), 7);

    // Fresh budget: automatic retries run again
    sleep(Duration::from_secs(2)).await;
    assert_eq!(fake.open_count(), 8);
    conn.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_cancels_pending_retry() {
    let fake = FakeTransport::new();
    fake.fail_opens(Some(TransportError::Unreachable("refused".into())));
    let conn = connection(&fake, test_config());

    assert!(!conn.connect().await);
    conn.disconnect().await;
    sleep(Duration::from_secs(600)).await;

    assert_eq!(fake.open_count(), 1);
    assert_eq!(conn.status(), Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_close_event_triggers_reconnect() {
    let fake = FakeTransport::new();
    let conn = connection(&fake, test_config());
    let (seen, _sub) = record_statuses(&conn);
    let mut rx = conn.notifications();

    assert!(conn.connect().await);
    fake.drop_link(TransportEvent::Closed);
    sleep(Duration::from_millis(10)).await;

    assert_eq!(conn.status(), Disconnected);
    assert!(matches!(drain(&mut rx)[0], Notification::ConnectionLost { .. }));

    sleep(Duration::from_secs(1)).await;
    assert!(conn.is_connected());
    assert_eq!(fake.open_count(), 2);
    assert_eq!(
        *seen.lock(),
        vec![Connecting, Connected, Disconnected, Connecting, Connected]
    );
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_goes_error() {
    let fake = FakeTransport::new();
    let conn = connection(&fake, test_config());

    assert!(conn.connect().await);
    fake.drop_link(TransportEvent::Failed("reset by peer".into()));
    sleep(Duration::from_millis(10)).await;

    assert_eq!(conn.status(), Error);
    conn.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_detects_silent_drop() {
    let fake = FakeTransport::new();
    let conn = connection(&fake, test_config());

    assert!(conn.connect().await);
    fake.go_silent();

    sleep(Duration::from_secs(29)).await;
    assert_eq!(conn.status(), Connected);
    assert!(!conn.is_connected());

    sleep(Duration::from_millis(1500)).await;
    assert_eq!(conn.status(), Disconnected);
    assert_eq!(fake.open_count(), 1);

    sleep(Duration::from_secs(1)).await;
    assert!(conn.is_connected());
    assert_eq!(fake.open_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_listener_does_not_break_connect() {
    let fake = FakeTransport::new();
    let conn = connection(&fake, test_config());

    let _bad = conn.on_status_change(|_| panic!("listener bug"));
    let (seen, _sub) = record_statuses(&conn);

    assert!(conn.connect().await);
    assert_eq!(*seen.lock(), vec![Connecting, Connected]);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_subscription_stops_callbacks() {
    let fake = FakeTransport::new();
    let conn = connection(&fake, test_config());

    let (seen, sub) = record_statuses(&conn);
    sub.unsubscribe();

    assert!(conn.connect().await);
    assert!(seen.lock().is_empty());
}
