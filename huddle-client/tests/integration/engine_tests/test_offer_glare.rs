use huddle_client::session::{NegotiationState, SessionRole};
use std::sync::atomic::Ordering;

use crate::integration::{create_test_engine, init_tracing};
use crate::utils::{answer_from, offer_from, pid, room_info, test_media, user_joined};

#[tokio::test]
async fn test_offer_glare_rolls_back_and_answers() {
    init_tracing();
    let mut t = create_test_engine();
    t.engine.handle_signal(room_info(&[])).await;
    t.engine.set_local_media(test_media());

    t.engine.handle_signal(user_joined("bob")).await;
    t.engine.handle_signal(offer_from("bob")).await;

    let probe = t.factory.probe("bob").expect("transport for bob");
    assert_eq!(probe.rollbacks.load(Ordering::SeqCst), 1);
    assert_eq!(
        probe.log(),
        vec!["tracks", "offer", "rollback", "remote:offer", "answer"]
    );
    assert_eq!(t.signaling.answers_to("bob").await.len(), 1);

    let session = t.engine.session(&pid("bob")).expect("session for bob");
    assert_eq!(session.state(), NegotiationState::AnswerSent);
    assert_eq!(session.role(), Some(SessionRole::Initiator));
}

#[tokio::test]
async fn test_failed_rollback_is_isolated() {
    init_tracing();
    let mut t = create_test_engine();
    t.engine.handle_signal(room_info(&[])).await;
    t.engine.set_local_media(test_media());

    t.engine.handle_signal(user_joined("bob")).await;
    t.engine.handle_signal(user_joined("carol")).await;

    let bob = t.factory.probe("bob").expect("transport for bob");
    bob.fail_rollback.store(true, Ordering::SeqCst);

    t.engine.handle_signal(offer_from("bob")).await;

    assert_eq!(bob.rollbacks.load(Ordering::SeqCst), 1);
    assert!(t.signaling.answers_to("bob").await.is_empty());
    assert_eq!(
        t.engine.session(&pid("bob")).map(|s| s.state()),
        Some(NegotiationState::OfferSent)
    );

    t.engine.handle_signal(answer_from("carol")).await;
    assert_eq!(
        t.engine.session(&pid("carol")).map(|s| s.state()),
        Some(NegotiationState::Stable)
    );
}
