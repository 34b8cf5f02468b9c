// tests/call_flow_test.rs
//! End-to-end call flows: simulated PBX → manager-interface client → tracker

mod ami_simulator;

use ami_simulator::{FakeAmiServer, SessionScript, SimulatedCall};
use pbx_call_monitor::ami::AmiClient;
use pbx_call_monitor::config::AmiServer;
use pbx_call_monitor::models::{CallOutcome, CallState};
use pbx_call_monitor::services::{CallTracker, HistoryLimits};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;

fn ami_server(addr: &str, reconnect_delay: Duration) -> AmiServer {
    AmiServer {
        addr: addr.to_string(),
        username: "monitor".to_string(),
        secret: "s3cret".to_string(),
        connect_timeout: Duration::from_secs(1),
        reconnect_delay,
    }
}

async fn wait_for_history(tracker: &CallTracker, expected: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if tracker.snapshot().await.history.len() == expected {
            return true;
        }
        sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn test_answered_call_lifecycle() {
    let tracker = CallTracker::new(HistoryLimits::default());
    let call = SimulatedCall::new("1700000000.10", "2601", "2602");

    tracker.fold_event(&call.caller_channel_created().to_event()).await;
    tracker.fold_event(&call.dial_begin().to_event()).await;

    let snap = tracker.snapshot().await;
    assert_eq!(snap.active.len(), 1);
    assert_eq!(snap.active[0].state, CallState::Dialing);

    for event in call.bridged() {
        tracker.fold_event(&event.to_event()).await;
    }
    assert_eq!(tracker.snapshot().await.active[0].state, CallState::Active);

    let mut hangups = call.hung_up("Normal Clearing").into_iter();
    if let Some(first) = hangups.next() {
        tracker.fold_event(&first.to_event()).await;
    }
    // one leg is still up
    assert_eq!(tracker.snapshot().await.active.len(), 1);

    for event in hangups {
        tracker.fold_event(&event.to_event()).await;
    }

    let snap = tracker.snapshot().await;
    assert!(snap.active.is_empty());
    assert_eq!(snap.history.len(), 1);
    let record = &snap.history[0];
    assert_eq!(record.id, "1700000000.10");
    assert_eq!(record.from, "2601");
    assert_eq!(record.to, "2602");
    assert_eq!(record.state, CallOutcome::Answered);
}

#[tokio::test]
async fn test_history_newest_first_across_calls() {
    let tracker = CallTracker::new(HistoryLimits::new(2, 24));

    for (id, caller) in [("a", "2601"), ("b", "2602"), ("c", "2603")] {
        for event in SimulatedCall::new(id, caller, "2700").answered_flow() {
            tracker.fold_event(&event.to_event()).await;
        }
    }

    let ids: Vec<String> = tracker
        .snapshot()
        .await
        .history
        .into_iter()
        .map(|call| call.id)
        .collect();
    assert_eq!(ids, vec!["c".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn test_client_feeds_tracker_after_login_retry() {
    let call = SimulatedCall::new("1700000000.20", "2601", "2602");
    let events = call.answered_flow().iter().map(|e| e.build()).collect();
    let server = FakeAmiServer::start(vec![
        SessionScript::RejectLogin,
        SessionScript::Accept(events),
    ])
    .await;

    let tracker = Arc::new(CallTracker::new(HistoryLimits::default()));
    let cancel = CancellationToken::new();
    let client = AmiClient::new(
        ami_server(&server.addr, Duration::from_millis(50)),
        tracker.clone(),
    );
    let handle = tokio::spawn(client.run(cancel.clone()));

    assert!(wait_for_history(&tracker, 1).await, "call never reached history");
    assert_eq!(server.logins(), 2);

    let record = tracker.snapshot().await.history.remove(0);
    assert_eq!(record.from, "2601");
    assert_eq!(record.to, "2602");

    cancel.cancel();
    let result = timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cancel_interrupts_reconnect_wait() {
    // grab a free port, then close it so every dial is refused
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let tracker = Arc::new(CallTracker::new(HistoryLimits::default()));
    let cancel = CancellationToken::new();
    let client = AmiClient::new(ami_server(&addr, Duration::from_secs(60)), tracker);
    let handle = tokio::spawn(client.run(cancel.clone()));

    sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    let result = timeout(Duration::from_secs(2), handle).await;
    assert!(matches!(result, Ok(Ok(Ok(())))));
}
