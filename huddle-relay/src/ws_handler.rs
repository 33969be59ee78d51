use crate::relay_service::{Membership, RelayService};
use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use huddle_core::SignalMessage;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub fn router(service: RelayService) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(service)
}

/// Serves the relay on an already bound listener until the server stops.
pub async fn serve(listener: TcpListener, service: RelayService) -> anyhow::Result<()> {
    info!("Signaling relay listening on ws://{}/ws", listener.local_addr()?);
    axum::serve(listener, router(service)).await?;
    Ok(())
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<RelayService>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, service))
}

async fn handle_socket(socket: WebSocket, service: RelayService) {
    let socket_id = service.open_socket();
    info!("New WebSocket connection #{}", socket_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let membership: Arc<Mutex<Option<Membership>>> = Arc::new(Mutex::new(None));

    let mut send_task = tokio::spawn(async move {
        while let Some(json) = rx.recv().await {
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();
        let membership = membership.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match SignalMessage::from_json(text.as_str()) {
                        Ok(signal) => {
                            let mut current =
                                membership.lock().unwrap_or_else(PoisonError::into_inner);
                            service.handle_signal(socket_id, signal, &tx, &mut current);
                        }
                        Err(e) => warn!("Invalid signal from socket #{}: {}", socket_id, e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    let departed = membership
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    if let Some(m) = departed {
        service.leave(&m);
    }
    info!("WebSocket #{} disconnected", socket_id);
}
