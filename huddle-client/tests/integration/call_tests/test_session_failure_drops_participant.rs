use huddle_client::session::{ConnectionStatus, SessionEvent};
use huddle_client::{Call, CallEvent, ClientConfig, EngineEvent, RosterChange};
use huddle_relay::RelayConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{MockTransportFactory, WAIT_TIMEOUT_MS, start_relay, test_media, wait_until};

fn config(addr: SocketAddr, id: &str) -> ClientConfig {
    ClientConfig {
        signaling_url: format!("ws://{}/ws", addr),
        room_id: "retro".to_owned(),
        participant_id: id.to_owned(),
        display_name: format!("{id}-name"),
        join_timeout_ms: 2000,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_session_failure_drops_participant() {
    init_tracing();
    let (addr, _relay) = start_relay(RelayConfig::default())
        .await
        .expect("Failed to start relay");

    let alice_transports = MockTransportFactory::new();
    let (alice, mut alice_events) =
        Call::join_with(config(addr, "alice"), Arc::new(alice_transports.clone()))
            .await
            .expect("alice joins");
    alice.set_local_media(test_media()).expect("engine running");

    let (bob, _bob_events) = Call::join_with(config(addr, "bob"), Arc::new(MockTransportFactory::new()))
        .await
        .expect("bob joins");

    let negotiated = wait_until(|| {
        alice_transports
            .probe("bob")
            .is_some_and(|p| p.log().iter().any(|e| e == "remote:answer"))
    })
    .await;
    assert!(negotiated, "alice should apply bob's answer");
    assert!(wait_until(|| alice.participants().len() == 1).await);

    let to_bob = alice_transports.probe("bob").expect("alice's transport for bob");
    assert!(to_bob.emit(SessionEvent::ConnectionChanged(ConnectionStatus::Failed)));

    assert!(wait_until(|| to_bob.closes() == 1).await);
    assert!(
        wait_until(|| alice.participants().is_empty()).await,
        "bob's record should go with his failed session"
    );

    let mut failed = false;
    let mut removed = false;
    while !removed {
        let event = tokio::time::timeout(Duration::from_millis(WAIT_TIMEOUT_MS), alice_events.recv())
            .await
            .expect("roster removal event")
            .expect("call events open");
        match event {
            CallEvent::Engine(EngineEvent::SessionFailed { participant, .. }) => {
                assert_eq!(participant.as_str(), "bob");
                failed = true;
            }
            CallEvent::Roster(RosterChange::Removed(id)) => {
                assert_eq!(id.as_str(), "bob");
                removed = true;
            }
            _ => {}
        }
    }
    assert!(failed, "the failure is reported before the removal");

    bob.leave().await.expect("bob leaves");
    alice.leave().await.expect("alice leaves");
}
