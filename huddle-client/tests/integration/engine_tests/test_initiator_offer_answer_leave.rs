use huddle_client::session::{NegotiationState, SessionRole};
use huddle_client::{EngineEvent, RoomRole};
use std::sync::atomic::Ordering;

use crate::integration::{create_test_engine, init_tracing};
use crate::utils::{answer_from, pid, room_info, test_media, user_joined, user_left};

#[tokio::test]
async fn test_initiator_offer_answer_leave() {
    init_tracing();
    let mut t = create_test_engine();

    t.engine.handle_signal(room_info(&[])).await;
    assert_eq!(t.engine.role(), Some(RoomRole::Initiator));

    t.engine.set_local_media(test_media());
    t.engine.handle_signal(user_joined("bob")).await;

    assert_eq!(t.signaling.offers_to("bob").await, vec!["mock-offer"]);
    let session = t.engine.session(&pid("bob")).expect("session for bob");
    assert_eq!(session.state(), NegotiationState::OfferSent);
    assert_eq!(session.role(), Some(SessionRole::Initiator));

    let probe = t.factory.probe("bob").expect("transport for bob");
    assert_eq!(probe.add_tracks_calls.load(Ordering::SeqCst), 1);

    // A repeated join notification while the offer is in flight is ignored.
    t.engine.handle_signal(user_joined("bob")).await;
    assert_eq!(t.signaling.offers_to("bob").await.len(), 1);
    assert_eq!(t.factory.created_for("bob"), 1);

    t.engine.handle_signal(answer_from("bob")).await;
    assert_eq!(
        t.engine.session(&pid("bob")).map(|s| s.state()),
        Some(NegotiationState::Stable)
    );

    t.engine.handle_signal(user_left("bob")).await;
    assert!(t.engine.session(&pid("bob")).is_none());
    assert_eq!(probe.closes(), 1);

    let events = t.drain_events();
    assert!(matches!(events[0], EngineEvent::RoleDecided(RoomRole::Initiator)));
    assert!(
        events
            .iter()
            .any(|e| matches!(e, EngineEvent::SessionClosed(id) if id.as_str() == "bob"))
    );
}
