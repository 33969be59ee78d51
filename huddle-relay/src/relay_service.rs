use crate::config::RelayConfig;
use dashmap::DashMap;
use huddle_core::utils::now_millis;
use huddle_core::{
    MediaState, ParticipantId, ParticipantRecord, Payload, RoomId, RoomSnapshot, SignalMessage,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Outbound JSON frames for one socket.
pub type Outbox = mpsc::UnboundedSender<String>;

/// The room and identity a socket joined with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub room_id: RoomId,
    pub participant: ParticipantId,
    socket_id: u64,
}

struct Connection {
    socket_id: u64,
    outbox: Outbox,
}

#[derive(Default)]
struct RoomState {
    participants: Vec<ParticipantRecord>,
}

struct RelayInner {
    config: RelayConfig,
    next_socket_id: AtomicU64,
    connections: DashMap<ParticipantId, Connection>,
    rooms: DashMap<RoomId, RoomState>,
}

/// Room registry plus the routing rules. Never looks inside descriptions or candidates.
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayInner>,
}

impl RelayService {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                config,
                next_socket_id: AtomicU64::new(1),
                connections: DashMap::new(),
                rooms: DashMap::new(),
            }),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    pub fn room_count(&self) -> usize {
        self.inner.rooms.len()
    }

    pub fn participants(&self, room_id: &RoomId) -> Vec<ParticipantRecord> {
        self.inner
            .rooms
            .get(room_id)
            .map(|room| room.participants.clone())
            .unwrap_or_default()
    }

    pub fn open_socket(&self) -> u64 {
        self.inner.next_socket_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn handle_signal(
        &self,
        socket_id: u64,
        msg: SignalMessage,
        outbox: &Outbox,
        membership: &mut Option<Membership>,
    ) {
        match &msg.payload {
            Payload::Join { name } => {
                let name = name.clone();
                self.join(socket_id, &msg, &name, outbox, membership);
            }
            Payload::Offer(_) | Payload::Answer(_) | Payload::IceCandidate(_) => {
                if membership.is_none() {
                    warn!("Dropping {} from socket that has not joined", msg.message_type());
                    return;
                }
                self.forward(msg);
            }
            Payload::MediaState { state, .. } => match membership {
                Some(m) => self.media_state(m, *state),
                None => warn!("Dropping MEDIA_STATE from socket that has not joined"),
            },
            Payload::Leave => {
                if let Some(m) = membership.take() {
                    self.leave(&m);
                }
            }
            Payload::RoomJoined
            | Payload::RoomInfo(_)
            | Payload::UserJoined { .. }
            | Payload::UserLeft { .. }
            | Payload::Error { .. } => {
                warn!("Ignoring relay-only {} sent by a client", msg.message_type());
            }
        }
    }

    fn join(
        &self,
        socket_id: u64,
        msg: &SignalMessage,
        name: &str,
        outbox: &Outbox,
        membership: &mut Option<Membership>,
    ) {
        let (Some(user_id), Some(room_id)) = (msg.from.clone(), msg.room_id.clone()) else {
            reply(outbox, error_message("Missing userId or roomId"));
            return;
        };

        if let Some(previous) = membership.take() {
            self.leave(&previous);
        }

        let admitted = {
            let mut room = self.inner.rooms.entry(room_id.clone()).or_default();
            room.participants.retain(|p| p.user_id != user_id);
            if room.participants.len() >= self.inner.config.max_participants {
                None
            } else {
                let others = room.participants.clone();
                room.participants
                    .push(ParticipantRecord::new(user_id.clone(), name));
                Some(others)
            }
        };

        let Some(others) = admitted else {
            warn!("Room {} is full, rejecting {}", room_id, user_id);
            self.inner
                .rooms
                .remove_if(&room_id, |_, room| room.participants.is_empty());
            reply(outbox, error_message("Room is full"));
            return;
        };

        self.inner.connections.insert(
            user_id.clone(),
            Connection {
                socket_id,
                outbox: outbox.clone(),
            },
        );
        *membership = Some(Membership {
            room_id: room_id.clone(),
            participant: user_id.clone(),
            socket_id,
        });
        info!(
            "{} ({}) joined room {} with {} others",
            user_id,
            name,
            room_id,
            others.len()
        );

        reply(
            outbox,
            SignalMessage::new(Payload::RoomJoined)
                .in_room(room_id.clone())
                .addressed_to(user_id.clone())
                .at(now_millis()),
        );

        let snapshot = RoomSnapshot {
            participant_count: Some(others.len() + 1),
            participants: others,
        };
        reply(
            outbox,
            SignalMessage::new(Payload::RoomInfo(snapshot))
                .in_room(room_id.clone())
                .addressed_to(user_id.clone())
                .at(now_millis()),
        );

        let announcement = SignalMessage::new(Payload::UserJoined {
            user_id: user_id.clone(),
            name: name.to_owned(),
        })
        .sent_by(user_id.clone())
        .in_room(room_id.clone())
        .at(now_millis());
        self.broadcast(&room_id, &user_id, &announcement);
    }

    fn forward(&self, msg: SignalMessage) {
        let Some(to) = msg.to.clone() else {
            warn!("Dropping {} without recipient", msg.message_type());
            return;
        };
        debug!(
            "Forwarding {} from {:?} to {}",
            msg.message_type(),
            msg.from,
            to
        );
        self.send_to(&to, &msg);
    }

    fn media_state(&self, membership: &Membership, state: MediaState) {
        if let Some(mut room) = self.inner.rooms.get_mut(&membership.room_id) {
            if let Some(record) = room
                .participants
                .iter_mut()
                .find(|p| p.user_id == membership.participant)
            {
                record.set_media(state);
            }
        }

        let update = SignalMessage::new(Payload::MediaState {
            user_id: Some(membership.participant.clone()),
            state,
        })
        .sent_by(membership.participant.clone())
        .in_room(membership.room_id.clone())
        .at(now_millis());
        self.broadcast(&membership.room_id, &membership.participant, &update);
    }

    /// Removes the participant and tells the rest of the room. Empty rooms are deleted.
    pub fn leave(&self, membership: &Membership) {
        let superseded = self
            .inner
            .connections
            .get(&membership.participant)
            .is_some_and(|c| c.socket_id != membership.socket_id);
        if superseded {
            debug!(
                "{} rejoined on another socket, keeping membership",
                membership.participant
            );
            return;
        }

        self.inner.connections.remove(&membership.participant);

        let removed = match self.inner.rooms.get_mut(&membership.room_id) {
            Some(mut room) => {
                let before = room.participants.len();
                room.participants
                    .retain(|p| p.user_id != membership.participant);
                room.participants.len() != before
            }
            None => false,
        };

        if self
            .inner
            .rooms
            .remove_if(&membership.room_id, |_, room| room.participants.is_empty())
            .is_some()
        {
            info!("Room {} is empty, deleted", membership.room_id);
        }

        if removed {
            info!(
                "{} left room {}",
                membership.participant, membership.room_id
            );
            let notice = SignalMessage::new(Payload::UserLeft {
                user_id: membership.participant.clone(),
            })
            .sent_by(membership.participant.clone())
            .in_room(membership.room_id.clone())
            .at(now_millis());
            self.broadcast(&membership.room_id, &membership.participant, &notice);
        }
    }

    fn broadcast(&self, room_id: &RoomId, except: &ParticipantId, msg: &SignalMessage) {
        let recipients: Vec<ParticipantId> = self
            .inner
            .rooms
            .get(room_id)
            .map(|room| {
                room.participants
                    .iter()
                    .map(|p| p.user_id.clone())
                    .filter(|id| id != except)
                    .collect()
            })
            .unwrap_or_default();

        for id in recipients {
            self.send_to(&id, msg);
        }
    }

    fn send_to(&self, id: &ParticipantId, msg: &SignalMessage) {
        let Some(connection) = self.inner.connections.get(id) else {
            warn!("Attempted to send {} to disconnected {}", msg.message_type(), id);
            return;
        };
        reply(&connection.outbox, msg.clone());
    }
}

fn error_message(text: &str) -> SignalMessage {
    SignalMessage::new(Payload::Error {
        error: text.to_owned(),
    })
    .at(now_millis())
}

fn reply(outbox: &Outbox, msg: SignalMessage) {
    match msg.to_json() {
        Ok(json) => {
            if outbox.send(json).is_err() {
                debug!("Socket closed before {} could be sent", msg.message_type());
            }
        }
        Err(e) => error!("Failed to serialize {}: {}", msg.message_type(), e),
    }
}
