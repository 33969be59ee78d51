use huddle_client::session::{
    PeerSession, PeerTransport, RtcPeerTransport, SessionSink, SignalingStatus,
};
use huddle_core::SdpKind;
use tokio::sync::mpsc;

use crate::integration::init_tracing;
use crate::utils::{pid, test_media};

#[tokio::test]
async fn test_rtc_offer_answer() {
    init_tracing();
    let (tx, _rx) = mpsc::unbounded_channel();

    let offerer = RtcPeerTransport::new(&[], SessionSink::new(pid("answerer"), 1, tx.clone()))
        .await
        .expect("offerer transport");
    let answerer = RtcPeerTransport::new(&[], SessionSink::new(pid("offerer"), 2, tx))
        .await
        .expect("answerer transport");

    offerer.add_tracks(&test_media()).await.expect("add tracks");
    assert_eq!(offerer.sender_count().await, 1);
    assert_eq!(answerer.sender_count().await, 0);

    let offer = offerer.create_offer().await.expect("offer");
    assert_eq!(offer.kind, SdpKind::Offer);
    assert!(offer.sdp.contains("m=audio"));
    assert_eq!(offerer.signaling_status(), SignalingStatus::HaveLocalOffer);

    answerer
        .set_remote_description(offer)
        .await
        .expect("apply offer");
    assert_eq!(answerer.signaling_status(), SignalingStatus::HaveRemoteOffer);

    let answer = answerer.create_answer().await.expect("answer");
    assert_eq!(answer.kind, SdpKind::Answer);

    offerer
        .set_remote_description(answer)
        .await
        .expect("apply answer");
    assert_eq!(offerer.signaling_status(), SignalingStatus::Stable);
    assert_eq!(answerer.signaling_status(), SignalingStatus::Stable);

    offerer.close().await.expect("close offerer");
    answerer.close().await.expect("close answerer");
}

#[tokio::test]
async fn test_rtc_session_attaches_media_once() {
    init_tracing();
    let (tx, _rx) = mpsc::unbounded_channel();
    let sink = SessionSink::new(pid("remote"), 1, tx);

    let transport = RtcPeerTransport::new(&[], sink.clone())
        .await
        .expect("transport");
    let mut session = PeerSession::new(pid("remote"), 1, Box::new(transport), sink);

    let media = test_media();
    assert!(session.attach_local_media(&media).await.expect("first attach"));
    assert!(!session.attach_local_media(&media).await.expect("second attach"));

    assert!(session.close().await);
    assert!(!session.close().await);
}
