use crate::integration::{create_test_engine, init_tracing};
use crate::utils::{room_info, test_media, user_joined};

#[tokio::test]
async fn test_no_offer_without_local_media() {
    init_tracing();
    let mut t = create_test_engine();
    t.engine.handle_signal(room_info(&[])).await;

    t.engine.handle_signal(user_joined("bob")).await;
    assert_eq!(t.engine.session_count(), 0);

    // Media arriving later does not send the skipped offer.
    t.engine.set_local_media(test_media());
    assert!(t.signaling.offers_to("bob").await.is_empty());

    t.engine.handle_signal(user_joined("dave")).await;
    assert_eq!(t.signaling.offers_to("dave").await.len(), 1);
    assert!(t.signaling.offers_to("bob").await.is_empty());
}

#[tokio::test]
async fn test_no_offer_before_room_snapshot() {
    init_tracing();
    let mut t = create_test_engine();
    t.engine.set_local_media(test_media());

    t.engine.handle_signal(user_joined("bob")).await;

    assert_eq!(t.engine.role(), None);
    assert_eq!(t.engine.session_count(), 0);
}
