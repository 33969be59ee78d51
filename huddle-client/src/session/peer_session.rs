use crate::session::{
    CandidateQueue, LocalMedia, PeerTransport, RemoteDescriptionApplied, SessionSink,
    SignalingStatus,
};
use anyhow::Result;
use huddle_core::{IceCandidate, ParticipantId, SessionDescription};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    Initiator,
    Responder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    OfferSent,
    AnswerSent,
    Stable,
    Closed,
}

/// Negotiation with exactly one remote participant.
///
/// Owns the transport and the candidates that arrived too early for it.
/// Candidates only reach the transport after a remote description has been
/// applied, in the order they arrived.
pub struct PeerSession {
    participant: ParticipantId,
    session_id: u64,
    role: Option<SessionRole>,
    state: NegotiationState,
    transport: Box<dyn PeerTransport>,
    sink: SessionSink,
    candidates: CandidateQueue,
    remote_applied: Option<RemoteDescriptionApplied>,
}

impl PeerSession {
    pub fn new(
        participant: ParticipantId,
        session_id: u64,
        transport: Box<dyn PeerTransport>,
        sink: SessionSink,
    ) -> Self {
        Self {
            participant,
            session_id,
            role: None,
            state: NegotiationState::Idle,
            transport,
            sink,
            candidates: CandidateQueue::default(),
            remote_applied: None,
        }
    }

    pub fn participant(&self) -> &ParticipantId {
        &self.participant
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn role(&self) -> Option<SessionRole> {
        self.role
    }

    /// Sets the role on first call. Later calls keep the first role.
    pub fn assign_role(&mut self, role: SessionRole) -> SessionRole {
        match self.role {
            Some(existing) => {
                if existing != role {
                    debug!(
                        "Session with {} keeps role {:?}, ignoring {:?}",
                        self.participant, existing, role
                    );
                }
                existing
            }
            None => {
                self.role = Some(role);
                role
            }
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == NegotiationState::Closed
    }

    /// Moves to `next` unless the session is already closed.
    pub fn transition(&mut self, next: NegotiationState) -> bool {
        if self.is_closed() {
            return false;
        }
        debug!(
            "Session with {}: {:?} -> {:?}",
            self.participant, self.state, next
        );
        self.state = next;
        true
    }

    pub fn signaling_status(&self) -> SignalingStatus {
        self.transport.signaling_status()
    }

    pub fn has_remote_description(&self) -> bool {
        self.remote_applied.is_some()
    }

    pub fn queued_candidates(&self) -> usize {
        self.candidates.len()
    }

    /// Attaches `media` unless the transport already has senders with tracks.
    /// Returns whether anything was attached.
    pub async fn attach_local_media(&mut self, media: &LocalMedia) -> Result<bool> {
        if self.transport.sender_count().await > 0 {
            debug!("Local media already attached for {}", self.participant);
            return Ok(false);
        }
        self.transport.add_tracks(media).await?;
        info!(
            "Attached {} local tracks for {}",
            media.len(),
            self.participant
        );
        Ok(true)
    }

    pub async fn create_offer(&mut self) -> Result<SessionDescription> {
        self.transport.create_offer().await
    }

    pub async fn create_answer(&mut self) -> Result<SessionDescription> {
        self.transport.create_answer().await
    }

    pub async fn rollback(&mut self) -> Result<()> {
        self.transport.rollback().await
    }

    /// Applies the remote description, then flushes any queued candidates.
    pub async fn apply_remote_description(&mut self, description: SessionDescription) -> Result<()> {
        self.transport.set_remote_description(description).await?;
        let applied = RemoteDescriptionApplied::new();
        self.remote_applied = Some(applied);
        self.candidates.flush(self.transport.as_ref(), applied).await;
        Ok(())
    }

    /// Queues `candidate`, applying it right away if the remote description is set.
    pub async fn add_remote_candidate(&mut self, candidate: IceCandidate) {
        if self.is_closed() {
            debug!("Dropping ICE candidate for closed session {}", self.participant);
            return;
        }
        self.candidates.enqueue(candidate);
        match self.remote_applied {
            Some(applied) => {
                self.candidates.flush(self.transport.as_ref(), applied).await;
            }
            None => debug!(
                "Queued ICE candidate for {} ({} pending)",
                self.participant,
                self.candidates.len()
            ),
        }
    }

    /// Releases the transport. Only the first call does anything.
    pub async fn close(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }

        self.sink.seal();
        self.state = NegotiationState::Closed;
        self.candidates.clear();

        if let Err(e) = self.transport.close().await {
            warn!("Error closing transport for {}: {:#}", self.participant, e);
        }
        info!("Session with {} closed", self.participant);
        true
    }
}
