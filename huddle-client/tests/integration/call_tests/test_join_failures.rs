use futures::StreamExt;
use huddle_client::{Call, CallError, ClientConfig, ConnectError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

use crate::integration::init_tracing;
use crate::utils::MockTransportFactory;

#[tokio::test]
async fn test_join_proceeds_after_ack_timeout() {
    init_tracing();

    // Completes the WebSocket upgrade, then never says anything.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let (_write, mut read) = ws.split();
        while let Some(Ok(_)) = read.next().await {}
    });

    let config = ClientConfig {
        signaling_url: format!("ws://{}/ws", addr),
        join_timeout_ms: 200,
        ..Default::default()
    };

    let started = Instant::now();
    let (call, _events) = Call::join_with(config, Arc::new(MockTransportFactory::new()))
        .await
        .expect("join carries on without acknowledgement");

    assert!(started.elapsed() >= Duration::from_millis(200));
    assert!(!call.is_joined());

    call.leave().await.expect("leave");
}

#[tokio::test]
async fn test_join_fails_when_relay_unreachable() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ClientConfig {
        signaling_url: format!("ws://{}/ws", addr),
        ..Default::default()
    };

    let res = Call::join_with(config, Arc::new(MockTransportFactory::new())).await;
    assert!(matches!(
        res,
        Err(CallError::Connect(ConnectError::Handshake(_)))
    ));
}

#[tokio::test]
async fn test_join_rejects_invalid_config() {
    let config = ClientConfig {
        room_id: String::new(),
        ..Default::default()
    };

    let res = Call::join_with(config, Arc::new(MockTransportFactory::new())).await;
    assert!(matches!(res, Err(CallError::Config(_))));
}
