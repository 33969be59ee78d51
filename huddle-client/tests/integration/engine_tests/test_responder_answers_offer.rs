use huddle_client::session::{ConnectionStatus, NegotiationState, SessionEvent, SessionRole};
use huddle_client::{EngineEvent, RoomRole};
use std::sync::atomic::Ordering;

use crate::integration::{create_test_engine, init_tracing};
use crate::utils::{offer_from, pid, room_info, test_media, user_joined};

#[tokio::test]
async fn test_responder_answers_offer() {
    init_tracing();
    let mut t = create_test_engine();

    t.engine.handle_signal(room_info(&["alice"])).await;
    assert_eq!(t.engine.role(), Some(RoomRole::Responder));
    t.engine.set_local_media(test_media());

    // Responders never initiate.
    t.engine.handle_signal(user_joined("carol")).await;
    assert_eq!(t.engine.session_count(), 0);
    assert!(t.signaling.offers_to("carol").await.is_empty());

    t.engine.handle_signal(offer_from("alice")).await;

    assert_eq!(t.signaling.answers_to("alice").await, vec!["mock-answer"]);
    let session = t.engine.session(&pid("alice")).expect("session for alice");
    assert_eq!(session.state(), NegotiationState::AnswerSent);
    assert_eq!(session.role(), Some(SessionRole::Responder));

    let probe = t.factory.probe("alice").expect("transport for alice");
    assert_eq!(probe.log(), vec!["remote:offer", "tracks", "answer"]);

    probe.emit(SessionEvent::ConnectionChanged(ConnectionStatus::Connected));
    t.engine.drain_session_updates().await;

    assert_eq!(
        t.engine.session(&pid("alice")).map(|s| s.state()),
        Some(NegotiationState::Stable)
    );
    assert!(
        t.drain_events()
            .iter()
            .any(|e| matches!(e, EngineEvent::SessionConnected(id) if id.as_str() == "alice"))
    );

    // Renegotiation does not attach the tracks a second time.
    t.engine.handle_signal(offer_from("alice")).await;
    assert_eq!(probe.add_tracks_calls.load(Ordering::SeqCst), 1);
    assert_eq!(t.signaling.answers_to("alice").await.len(), 2);
}
