use huddle_client::session::{ConnectionStatus, SessionEvent};
use huddle_client::{CallError, EngineEvent};
use std::time::Duration;

use crate::integration::{TestEngine, create_test_engine, init_tracing};
use crate::utils::{answer_from, room_info, test_media, user_joined, wait_until};

#[tokio::test]
async fn test_engine_run_loop() {
    init_tracing();
    let TestEngine {
        engine,
        mut events,
        factory,
        ..
    } = create_test_engine();

    let (handle, task) = engine.spawn();
    assert!(handle.is_running());

    handle.signal(room_info(&[]));
    handle.set_local_media(test_media());
    handle.signal(user_joined("bob"));

    let offered = wait_until(|| {
        factory
            .probe("bob")
            .is_some_and(|p| p.log().iter().any(|e| e == "offer"))
    })
    .await;
    assert!(offered, "engine should offer to bob");

    handle.signal(answer_from("bob"));
    let probe = factory.probe("bob").expect("transport for bob");
    assert!(wait_until(|| probe.log().iter().any(|e| e == "remote:answer")).await);

    probe.emit(SessionEvent::ConnectionChanged(ConnectionStatus::Connected));

    let connected = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(event) = events.recv().await {
            if matches!(event, EngineEvent::SessionConnected(_)) {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false);
    assert!(connected);

    handle.shutdown().await.expect("shutdown acknowledged");
    task.await.expect("engine task");
    assert_eq!(probe.closes(), 1);

    assert!(matches!(
        handle.shutdown().await,
        Err(CallError::EngineStopped)
    ));
}
