use crate::engine::{EngineCommand, EngineEvent, EngineHandle, RoomRole};
use crate::error::NegotiationError;
use crate::session::{
    ConnectionStatus, LocalMedia, NegotiationState, PeerSession, PeerTransportFactory,
    SessionEvent, SessionRole, SessionSink, SessionUpdate, SignalingStatus,
};
use crate::signaling::SignalingOutput;
use huddle_core::{
    IceCandidate, ParticipantId, Payload, RoomContext, RoomSnapshot, SessionDescription,
    SignalMessage,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Drives one peer session per remote participant in a room.
///
/// Handlers run one at a time on a single task. Every handler checks the
/// session's state after it wakes up from a transport call, and a failure in
/// one participant's handler is logged without touching the other sessions.
pub struct NegotiationEngine {
    room: RoomContext,
    factory: Arc<dyn PeerTransportFactory>,
    signaling: Arc<dyn SignalingOutput>,
    sessions: HashMap<ParticipantId, PeerSession>,
    role: Option<RoomRole>,
    /// Left the room since they were last announced. Late candidates from them are dropped.
    departed: HashSet<ParticipantId>,
    local_media: Option<LocalMedia>,
    next_session_id: u64,
    session_tx: mpsc::UnboundedSender<SessionUpdate>,
    session_rx: mpsc::UnboundedReceiver<SessionUpdate>,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
}

impl NegotiationEngine {
    pub fn new(
        room: RoomContext,
        factory: Arc<dyn PeerTransportFactory>,
        signaling: Arc<dyn SignalingOutput>,
    ) -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (session_tx, session_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let engine = Self {
            room,
            factory,
            signaling,
            sessions: HashMap::new(),
            role: None,
            departed: HashSet::new(),
            local_media: None,
            next_session_id: 0,
            session_tx,
            session_rx,
            events_tx,
        };
        (engine, events_rx)
    }

    /// Moves the engine onto its own task.
    pub fn spawn(self) -> (EngineHandle, JoinHandle<()>) {
        let (handle, commands) = EngineHandle::new();
        let task = tokio::spawn(self.run(commands));
        (handle, task)
    }

    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<EngineCommand>) {
        info!("Negotiation engine started for room {}", self.room.room_id());

        loop {
            tokio::select! {
                cmd = commands.recv() => {
                    match cmd {
                        Some(EngineCommand::Signal(msg)) => self.handle_signal(msg).await,
                        Some(EngineCommand::LocalMediaReady(media)) => self.set_local_media(media),
                        Some(EngineCommand::SignalingLost) => {
                            warn!("Signaling connection lost");
                            self.emit(EngineEvent::SignalingLost);
                        }
                        Some(EngineCommand::Shutdown(ack)) => {
                            self.shutdown().await;
                            let _ = ack.send(());
                            break;
                        }
                        None => {
                            info!("Command channel closed. Shutting down engine.");
                            self.shutdown().await;
                            break;
                        }
                    }
                }

                update = self.session_rx.recv() => {
                    if let Some(update) = update {
                        self.handle_session_update(update).await;
                    }
                }
            }
        }

        info!("Negotiation engine finished");
    }

    pub fn room(&self) -> &RoomContext {
        &self.room
    }

    pub fn role(&self) -> Option<RoomRole> {
        self.role
    }

    pub fn session(&self, participant: &ParticipantId) -> Option<&PeerSession> {
        self.sessions.get(participant)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Used by sessions created from now on. Does not send offers that were skipped earlier.
    pub fn set_local_media(&mut self, media: LocalMedia) {
        info!("Local media ready ({} tracks)", media.len());
        self.local_media = Some(media);
    }

    /// Entry point for every inbound signaling message.
    pub async fn handle_signal(&mut self, msg: SignalMessage) {
        if let Some(room_id) = &msg.room_id {
            if room_id != self.room.room_id() {
                debug!("Discarding {} for room {}", msg.message_type(), room_id);
                return;
            }
        }
        if let Some(to) = &msg.to {
            if to != self.room.local_id() {
                debug!("Discarding {} addressed to {}", msg.message_type(), to);
                return;
            }
        }
        if msg.from.as_ref() == Some(self.room.local_id()) {
            debug!("Discarding own {} echo", msg.message_type());
            return;
        }

        let kind = msg.message_type();
        let from = msg.from;

        let res = match msg.payload {
            Payload::RoomInfo(snapshot) => {
                self.handle_room_snapshot(&snapshot);
                Ok(())
            }
            Payload::UserJoined { user_id, .. } => self.handle_user_joined(&user_id).await,
            Payload::UserLeft { user_id } => {
                self.handle_user_left(&user_id).await;
                Ok(())
            }
            Payload::Offer(offer) => match from {
                Some(remote) => self.handle_offer(&remote, offer).await,
                None => Err(NegotiationError::MissingSender(kind)),
            },
            Payload::Answer(answer) => match from {
                Some(remote) => self.handle_answer(&remote, answer).await,
                None => Err(NegotiationError::MissingSender(kind)),
            },
            Payload::IceCandidate(candidate) => match from {
                Some(remote) => self.handle_candidate(&remote, candidate).await,
                None => Err(NegotiationError::MissingSender(kind)),
            },
            Payload::Join { .. }
            | Payload::Leave
            | Payload::RoomJoined
            | Payload::MediaState { .. }
            | Payload::Error { .. } => Ok(()),
        };

        if let Err(e) = res {
            error!("Failed to handle {}: {}", kind, e);
        }
    }

    /// Decides the room role. Only the first snapshot counts.
    pub fn handle_room_snapshot(&mut self, snapshot: &RoomSnapshot) {
        if let Some(role) = self.role {
            debug!("Room role already decided as {:?}", role);
            return;
        }

        let role = RoomRole::from_snapshot(snapshot, self.room.local_id());
        info!(
            "Room {} has {} other participants, acting as {:?}",
            self.room.room_id(),
            snapshot.participants.len(),
            role
        );
        self.role = Some(role);
        self.emit(EngineEvent::RoleDecided(role));
    }

    pub async fn handle_user_joined(&mut self, remote: &ParticipantId) -> Result<(), NegotiationError> {
        if remote == self.room.local_id() {
            return Ok(());
        }
        self.departed.remove(remote);

        let role = match self.role {
            Some(role) if role.initiates() => role,
            other => {
                debug!("Not offering to {}, role is {:?}", remote, other);
                return Ok(());
            }
        };
        let Some(media) = self.local_media.clone() else {
            warn!("Local media not ready, no offer for {}", remote);
            return Ok(());
        };

        let session = self.ensure_session(remote, Some(role.into())).await?;

        let status = session.signaling_status();
        if status != SignalingStatus::Stable {
            warn!("Skipping offer to {}, negotiation in progress ({:?})", remote, status);
            return Ok(());
        }

        session
            .attach_local_media(&media)
            .await
            .map_err(|e| NegotiationError::transport(remote, "attach local media", e))?;
        let offer = session
            .create_offer()
            .await
            .map_err(|e| NegotiationError::transport(remote, "create offer", e))?;

        if !session.transition(NegotiationState::OfferSent) {
            warn!("Session with {} closed while creating offer", remote);
            return Ok(());
        }

        info!("Sending offer to {}", remote);
        self.signaling.send_offer(remote.clone(), offer).await;
        Ok(())
    }

    pub async fn handle_offer(
        &mut self,
        remote: &ParticipantId,
        offer: SessionDescription,
    ) -> Result<(), NegotiationError> {
        self.departed.remove(remote);
        let media = self.local_media.clone();
        let session = self.ensure_session(remote, Some(SessionRole::Responder)).await?;

        let status = session.signaling_status();
        if status != SignalingStatus::Stable {
            warn!("Offer glare with {} ({:?}), rolling back", remote, status);
            if let Err(e) = session.rollback().await {
                warn!("Rollback for {} failed: {:#}", remote, e);
            }
        }

        session
            .apply_remote_description(offer)
            .await
            .map_err(|e| NegotiationError::transport(remote, "apply offer", e))?;

        if let Some(media) = &media {
            if let Err(e) = session.attach_local_media(media).await {
                warn!("Answering {} without local media: {:#}", remote, e);
            }
        }

        let answer = session
            .create_answer()
            .await
            .map_err(|e| NegotiationError::transport(remote, "create answer", e))?;

        if !session.transition(NegotiationState::AnswerSent) {
            warn!("Session with {} closed while creating answer", remote);
            return Ok(());
        }

        info!("Sending answer to {}", remote);
        self.signaling.send_answer(remote.clone(), answer).await;
        Ok(())
    }

    pub async fn handle_answer(
        &mut self,
        remote: &ParticipantId,
        answer: SessionDescription,
    ) -> Result<(), NegotiationError> {
        let Some(session) = self.sessions.get_mut(remote) else {
            warn!("Discarding answer from {}, no session", remote);
            return Ok(());
        };
        if session.state() != NegotiationState::OfferSent {
            warn!(
                "Discarding answer from {}, session is {:?}",
                remote,
                session.state()
            );
            return Ok(());
        }

        session
            .apply_remote_description(answer)
            .await
            .map_err(|e| NegotiationError::transport(remote, "apply answer", e))?;
        session.transition(NegotiationState::Stable);
        info!("Negotiation with {} complete", remote);
        Ok(())
    }

    pub async fn handle_candidate(
        &mut self,
        remote: &ParticipantId,
        candidate: IceCandidate,
    ) -> Result<(), NegotiationError> {
        if self.departed.contains(remote) {
            debug!("Dropping late candidate from departed {}", remote);
            return Ok(());
        }
        let session = self.ensure_session(remote, None).await?;
        session.add_remote_candidate(candidate).await;
        Ok(())
    }

    pub async fn handle_user_left(&mut self, remote: &ParticipantId) {
        if remote != self.room.local_id() {
            self.departed.insert(remote.clone());
        }
        if self.remove_session(remote).await {
            info!("{} left, session removed", remote);
            self.emit(EngineEvent::SessionClosed(remote.clone()));
        }
    }

    /// Closes every session and forgets the room role.
    pub async fn shutdown(&mut self) {
        let participants: Vec<ParticipantId> = self.sessions.keys().cloned().collect();
        for participant in participants {
            if self.remove_session(&participant).await {
                self.emit(EngineEvent::SessionClosed(participant));
            }
        }
        self.role = None;
        self.departed.clear();
        info!("All sessions in room {} closed", self.room.room_id());
    }

    pub async fn handle_session_update(&mut self, update: SessionUpdate) {
        let SessionUpdate {
            participant,
            session_id,
            event,
        } = update;

        let Some(session) = self.sessions.get_mut(&participant) else {
            debug!("Dropping event for departed {}", participant);
            return;
        };
        if session.session_id() != session_id {
            debug!("Dropping event from replaced session with {}", participant);
            return;
        }

        match event {
            SessionEvent::LocalCandidate(candidate) => {
                self.signaling.send_ice(participant, candidate).await;
            }
            SessionEvent::RemoteTrack(track) => {
                self.emit(EngineEvent::RemoteTrack { participant, track });
            }
            SessionEvent::ConnectionChanged(ConnectionStatus::Connected) => {
                if session.state() == NegotiationState::AnswerSent {
                    session.transition(NegotiationState::Stable);
                }
                info!("Connected to {}", participant);
                self.emit(EngineEvent::SessionConnected(participant));
            }
            SessionEvent::ConnectionChanged(ConnectionStatus::Failed) => {
                error!("Connection to {} failed", participant);
                self.remove_session(&participant).await;
                self.emit(EngineEvent::SessionFailed {
                    participant,
                    reason: "peer connection failed".to_owned(),
                });
            }
            SessionEvent::ConnectionChanged(status) => {
                debug!("Connection to {} is {:?}", participant, status);
            }
        }
    }

    /// Handles whatever the transports have reported so far without waiting.
    pub async fn drain_session_updates(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(update) = self.session_rx.try_recv() {
            self.handle_session_update(update).await;
            handled += 1;
        }
        handled
    }

    /// Finds or creates the session with `remote`. `role` is applied if the
    /// session has none yet.
    async fn ensure_session(
        &mut self,
        remote: &ParticipantId,
        role: Option<SessionRole>,
    ) -> Result<&mut PeerSession, NegotiationError> {
        if !self.sessions.contains_key(remote) {
            self.next_session_id += 1;
            let session_id = self.next_session_id;
            let sink = SessionSink::new(remote.clone(), session_id, self.session_tx.clone());

            let transport = self
                .factory
                .create(remote, sink.clone())
                .await
                .map_err(|cause| NegotiationError::TransportSetup {
                    participant: remote.clone(),
                    cause,
                })?;

            debug!("Created session {} for {}", session_id, remote);
            self.sessions.insert(
                remote.clone(),
                PeerSession::new(remote.clone(), session_id, transport, sink),
            );
        }

        let session = self
            .sessions
            .get_mut(remote)
            .ok_or_else(|| NegotiationError::UnknownSession(remote.clone()))?;
        if let Some(role) = role {
            session.assign_role(role);
        }
        Ok(session)
    }

    /// Closes the session before dropping it from the map.
    async fn remove_session(&mut self, remote: &ParticipantId) -> bool {
        let Some(session) = self.sessions.get_mut(remote) else {
            return false;
        };
        session.close().await;
        self.sessions.remove(remote);
        true
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.events_tx.send(event);
    }
}
