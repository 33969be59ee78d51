use huddle_client::EngineEvent;
use huddle_client::session::{ConnectionStatus, SessionEvent};
use huddle_core::IceCandidate;

use crate::integration::{create_test_engine, init_tracing};
use crate::utils::{offer_from, pid, room_info};

#[tokio::test]
async fn test_failed_connection_removes_session() {
    init_tracing();
    let mut t = create_test_engine();
    t.engine.handle_signal(room_info(&["alice"])).await;
    t.engine.handle_signal(offer_from("alice")).await;

    let first = t.factory.probe("alice").expect("first transport");
    first.emit(SessionEvent::ConnectionChanged(ConnectionStatus::Failed));
    t.engine.drain_session_updates().await;

    assert!(t.engine.session(&pid("alice")).is_none());
    assert_eq!(first.closes(), 1);
    assert!(t.drain_events().iter().any(
        |e| matches!(e, EngineEvent::SessionFailed { participant, .. } if participant.as_str() == "alice")
    ));

    // A fresh offer starts a brand new session.
    t.engine.handle_signal(offer_from("alice")).await;
    assert_eq!(t.factory.created_for("alice"), 2);
    assert!(t.engine.session(&pid("alice")).is_some());

    // The old transport is sealed and cannot disturb its successor.
    assert!(!first.emit(SessionEvent::LocalCandidate(IceCandidate::new("stale"))));
}

#[tokio::test]
async fn test_local_candidates_are_forwarded() {
    init_tracing();
    let mut t = create_test_engine();
    t.engine.handle_signal(room_info(&["alice"])).await;
    t.engine.handle_signal(offer_from("alice")).await;

    let probe = t.factory.probe("alice").expect("transport for alice");
    probe.emit(SessionEvent::LocalCandidate(IceCandidate::new("cand-1")));
    probe.emit(SessionEvent::ConnectionChanged(ConnectionStatus::Connecting));

    assert_eq!(t.engine.drain_session_updates().await, 2);
    assert_eq!(
        t.signaling.ice_to("alice").await,
        vec![IceCandidate::new("cand-1")]
    );
}
