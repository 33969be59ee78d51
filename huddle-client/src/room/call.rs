use crate::config::ClientConfig;
use crate::engine::{EngineEvent, EngineHandle, NegotiationEngine};
use crate::error::CallError;
use crate::room::{Roster, RosterChange};
use crate::session::{LocalMedia, PeerTransportFactory, RtcTransportFactory};
use crate::signaling::{EventKind, RoomSignaling, SignalEvent, SignalingClient, SubscriptionId};
use huddle_core::{MediaState, MessageType, ParticipantRecord, RoomContext};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub enum CallEvent {
    Roster(RosterChange),
    Engine(EngineEvent),
}

/// Our presence in one room: the relay connection, the roster and the engine.
pub struct Call {
    room: RoomContext,
    signaling: RoomSignaling,
    roster: Arc<Mutex<Roster>>,
    engine: EngineHandle,
    engine_task: JoinHandle<()>,
    subscriptions: Vec<SubscriptionId>,
}

impl Call {
    /// Joins with real webrtc-rs peer connections.
    pub async fn join(
        config: ClientConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<CallEvent>), CallError> {
        let factory = Arc::new(RtcTransportFactory::new(config.ice_servers.clone()));
        Self::join_with(config, factory).await
    }

    /// Connects, announces us and waits a bounded time for `ROOM_JOINED`.
    /// Past the timeout the call carries on and converges from later events.
    pub async fn join_with(
        config: ClientConfig,
        factory: Arc<dyn PeerTransportFactory>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<CallEvent>), CallError> {
        config.validate()?;

        let room = config.room_context();
        let client = SignalingClient::new(config.signaling_url.as_str());
        let signaling = RoomSignaling::new(client.clone(), room.clone());
        let roster = Arc::new(Mutex::new(Roster::new(room.local_id().clone())));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let (engine, mut engine_events) =
            NegotiationEngine::new(room.clone(), factory, Arc::new(signaling.clone()));
        let (engine, engine_task) = engine.spawn();

        let forward_tx = events_tx.clone();
        let forward_roster = roster.clone();
        tokio::spawn(async move {
            while let Some(event) = engine_events.recv().await {
                // A failed session takes its participant out of the roster too.
                let departed = match &event {
                    EngineEvent::SessionFailed { participant, .. } => {
                        lock(&forward_roster).remove(participant)
                    }
                    _ => RosterChange::Unchanged,
                };
                if forward_tx.send(CallEvent::Engine(event)).is_err() {
                    break;
                }
                if departed != RosterChange::Unchanged
                    && forward_tx.send(CallEvent::Roster(departed)).is_err()
                {
                    break;
                }
            }
        });

        let mut subscriptions = Vec::new();

        // Roster first so it is current by the time the engine sees the message.
        let roster_ref = roster.clone();
        subscriptions.push(client.subscribe(EventKind::AnyMessage, move |event| {
            let SignalEvent::Message(msg) = event else { return };
            let change = lock(&roster_ref).apply(msg);
            if change != RosterChange::Unchanged {
                let _ = events_tx.send(CallEvent::Roster(change));
            }
        }));

        let engine_ref = engine.clone();
        subscriptions.push(client.subscribe(EventKind::AnyMessage, move |event| {
            if let SignalEvent::Message(msg) = event {
                engine_ref.signal(msg.clone());
            }
        }));

        let (joined_tx, joined_rx) = oneshot::channel();
        let joined_slot = Mutex::new(Some(joined_tx));
        let joined_sub = client.subscribe(EventKind::Message(MessageType::RoomJoined), move |_| {
            if let Some(tx) = lock(&joined_slot).take() {
                let _ = tx.send(());
            }
        });

        if let Err(e) = client.connect().await {
            client.unsubscribe(joined_sub);
            for id in subscriptions {
                client.unsubscribe(id);
            }
            let _ = engine.shutdown().await;
            return Err(e.into());
        }

        let lost_ref = engine.clone();
        subscriptions.push(client.subscribe(EventKind::Disconnected, move |_| {
            lost_ref.signaling_lost();
        }));

        info!(
            "Joining room {} as {} ({})",
            room.room_id(),
            room.display_name(),
            room.local_id()
        );
        signaling.send_join();

        match tokio::time::timeout(config.join_timeout(), joined_rx).await {
            Ok(Ok(())) => info!("Joined room {}", room.room_id()),
            Ok(Err(_)) => warn!("Connection closed before join was acknowledged"),
            Err(_) => warn!(
                "No join acknowledgement within {:?}, continuing",
                config.join_timeout()
            ),
        }
        client.unsubscribe(joined_sub);

        let call = Self {
            room,
            signaling,
            roster,
            engine,
            engine_task,
            subscriptions,
        };
        Ok((call, events_rx))
    }

    pub fn room(&self) -> &RoomContext {
        &self.room
    }

    pub fn is_joined(&self) -> bool {
        lock(&self.roster).is_joined()
    }

    pub fn participants(&self) -> Vec<ParticipantRecord> {
        lock(&self.roster).participants()
    }

    pub fn last_error(&self) -> Option<String> {
        lock(&self.roster).last_error().map(str::to_owned)
    }

    pub fn set_local_media(&self, media: LocalMedia) -> Result<(), CallError> {
        if self.engine.set_local_media(media) {
            Ok(())
        } else {
            Err(CallError::EngineStopped)
        }
    }

    pub fn set_media_state(&self, state: MediaState) {
        self.signaling.send_media_state(state);
    }

    /// Announces our departure, closes every session and drops the relay connection.
    pub async fn leave(self) -> Result<(), CallError> {
        let client = self.signaling.client().clone();

        self.signaling.send_leave();
        let shutdown = self.engine.shutdown().await;

        for id in self.subscriptions {
            client.unsubscribe(id);
        }
        client.disconnect();

        if let Err(e) = self.engine_task.await {
            warn!("Engine task ended abnormally: {}", e);
        }
        info!("Left room {}", self.room.room_id());
        shutdown
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
