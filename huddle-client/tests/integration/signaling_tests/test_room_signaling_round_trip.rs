use huddle_client::{EventKind, RoomSignaling, SignalEvent, SignalingClient, SignalingOutput};
use huddle_core::{
    MessageType, ParticipantId, Payload, RoomContext, RoomId, SessionDescription, SignalMessage,
};
use huddle_relay::RelayConfig;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::integration::init_tracing;
use crate::utils::start_relay;

async fn next_message(rx: &mut mpsc::UnboundedReceiver<SignalEvent>) -> SignalMessage {
    match tokio::time::timeout(Duration::from_secs(3), rx.recv()).await {
        Ok(Some(SignalEvent::Message(msg))) => msg,
        other => panic!("expected a message, got {other:?}"),
    }
}

#[tokio::test]
async fn test_room_signaling_round_trip() {
    init_tracing();
    let (addr, _relay) = start_relay(RelayConfig::default())
        .await
        .expect("Failed to start relay");
    let url = format!("ws://{}/ws", addr);

    let alice_ctx = RoomContext::new(RoomId::from("r"), ParticipantId::from("alice"), "Alice");
    let bob_ctx = RoomContext::new(RoomId::from("r"), ParticipantId::from("bob"), "Bob");

    let alice = RoomSignaling::new(SignalingClient::new(url.as_str()), alice_ctx);
    let bob = RoomSignaling::new(SignalingClient::new(url.as_str()), bob_ctx);

    let (_, mut alice_joined) = alice
        .client()
        .events(EventKind::Message(MessageType::UserJoined));
    let (_, mut bob_any) = bob.client().events(EventKind::AnyMessage);

    alice.client().connect().await.expect("alice connect");
    bob.client().connect().await.expect("bob connect");

    alice.send_join();
    tokio::time::sleep(Duration::from_millis(100)).await;
    bob.send_join();

    let ack = next_message(&mut bob_any).await;
    assert_eq!(ack.message_type(), MessageType::RoomJoined);
    let info = next_message(&mut bob_any).await;
    let Payload::RoomInfo(snapshot) = info.payload else {
        panic!("expected ROOM_INFO");
    };
    assert_eq!(snapshot.participants.len(), 1);

    let joined = next_message(&mut alice_joined).await;
    assert_eq!(joined.from, Some(ParticipantId::from("bob")));

    alice
        .send_offer(ParticipantId::from("bob"), SessionDescription::offer("sdp-a"))
        .await;

    let offer = next_message(&mut bob_any).await;
    assert_eq!(offer.from, Some(ParticipantId::from("alice")));
    assert_eq!(offer.to, Some(ParticipantId::from("bob")));
    assert_eq!(offer.room_id, Some(RoomId::from("r")));
    assert!(offer.timestamp.is_some());
    assert_eq!(offer.payload, Payload::Offer(SessionDescription::offer("sdp-a")));

    alice.send_leave();
    let left = next_message(&mut bob_any).await;
    assert_eq!(
        left.payload,
        Payload::UserLeft {
            user_id: ParticipantId::from("alice")
        }
    );

    alice.client().disconnect();
    bob.client().disconnect();
}
