use crate::integration::{create_test_engine, init_tracing};
use crate::utils::{candidate_from, offer_from, pid, room_info};

#[tokio::test]
async fn test_candidates_wait_for_description() {
    init_tracing();
    let mut t = create_test_engine();
    t.engine.handle_signal(room_info(&["carol"])).await;

    t.engine.handle_signal(candidate_from("carol", "c1")).await;
    t.engine.handle_signal(candidate_from("carol", "bad")).await;

    let probe = t.factory.probe("carol").expect("session created by candidate");
    assert!(probe.log().is_empty(), "nothing applied before the offer");
    assert_eq!(
        t.engine.session(&pid("carol")).map(|s| s.queued_candidates()),
        Some(2)
    );

    t.engine.handle_signal(offer_from("carol")).await;
    t.engine.handle_signal(candidate_from("carol", "c2")).await;

    assert_eq!(
        probe.log(),
        vec!["remote:offer", "candidate:c1", "answer", "candidate:c2"]
    );
    assert_eq!(probe.applied_candidates(), vec!["c1", "c2"]);

    let session = t.engine.session(&pid("carol")).expect("session for carol");
    assert_eq!(session.queued_candidates(), 0);
    assert!(session.has_remote_description());
    assert_eq!(t.factory.created_for("carol"), 1);
}
