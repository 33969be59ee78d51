use crate::signaling::SignalingClient;
use async_trait::async_trait;
use huddle_core::{
    IceCandidate, MediaState, ParticipantId, Payload, RoomContext, SessionDescription,
    SignalMessage,
};

/// Outbound half of the negotiation protocol, as the engine sees it.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    async fn send_offer(&self, to: ParticipantId, offer: SessionDescription);

    async fn send_answer(&self, to: ParticipantId, answer: SessionDescription);

    async fn send_ice(&self, to: ParticipantId, candidate: IceCandidate);
}

/// Stamps every outgoing message with our room and participant id.
#[derive(Clone)]
pub struct RoomSignaling {
    client: SignalingClient,
    room: RoomContext,
}

impl RoomSignaling {
    pub fn new(client: SignalingClient, room: RoomContext) -> Self {
        Self { client, room }
    }

    pub fn client(&self) -> &SignalingClient {
        &self.client
    }

    fn envelope(&self, payload: Payload) -> SignalMessage {
        SignalMessage::new(payload)
            .sent_by(self.room.local_id().clone())
            .in_room(self.room.room_id().clone())
    }

    pub fn send_join(&self) {
        self.client.send(self.envelope(Payload::Join {
            name: self.room.display_name().to_owned(),
        }));
    }

    pub fn send_leave(&self) {
        self.client.send(self.envelope(Payload::Leave));
    }

    pub fn send_media_state(&self, state: MediaState) {
        self.client.send(self.envelope(Payload::MediaState {
            user_id: None,
            state,
        }));
    }
}

#[async_trait]
impl SignalingOutput for RoomSignaling {
    async fn send_offer(&self, to: ParticipantId, offer: SessionDescription) {
        self.client
            .send(self.envelope(Payload::Offer(offer)).addressed_to(to));
    }

    async fn send_answer(&self, to: ParticipantId, answer: SessionDescription) {
        self.client
            .send(self.envelope(Payload::Answer(answer)).addressed_to(to));
    }

    async fn send_ice(&self, to: ParticipantId, candidate: IceCandidate) {
        self.client
            .send(self.envelope(Payload::IceCandidate(candidate)).addressed_to(to));
    }
}
