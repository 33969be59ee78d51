use crate::error::ProtocolError;
use crate::model::participant::{MediaState, ParticipantId, ParticipantRecord};
use crate::model::room::RoomId;
use crate::model::wire::{MessageType, WireMessage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

/// One half of the offer/answer handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    pub sdp: String,
    #[serde(rename = "type")]
    pub kind: SdpKind,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp: sdp.into(),
            kind: SdpKind::Offer,
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp: sdp.into(),
            kind: SdpKind::Answer,
        }
    }
}

/// A network-path candidate as carried by `ICE_CANDIDATE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default, rename = "sdpMLineIndex")]
    pub sdp_m_line_index: Option<u16>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
        }
    }
}

/// Participants already present when we entered the room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    #[serde(default)]
    pub participants: Vec<ParticipantRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_count: Option<usize>,
}

impl RoomSnapshot {
    pub fn new(participants: Vec<ParticipantRecord>) -> Self {
        Self {
            participants,
            participant_count: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

/// Typed body of a signaling message. One variant per wire `type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Join {
        name: String,
    },
    Leave,
    RoomJoined,
    RoomInfo(RoomSnapshot),
    UserJoined {
        user_id: ParticipantId,
        name: String,
    },
    UserLeft {
        user_id: ParticipantId,
    },
    Offer(SessionDescription),
    Answer(SessionDescription),
    IceCandidate(IceCandidate),
    MediaState {
        user_id: Option<ParticipantId>,
        state: MediaState,
    },
    Error {
        error: String,
    },
}

impl Payload {
    pub fn message_type(&self) -> MessageType {
        match self {
            Payload::Join { .. } => MessageType::Join,
            Payload::Leave => MessageType::Leave,
            Payload::RoomJoined => MessageType::RoomJoined,
            Payload::RoomInfo(_) => MessageType::RoomInfo,
            Payload::UserJoined { .. } => MessageType::UserJoined,
            Payload::UserLeft { .. } => MessageType::UserLeft,
            Payload::Offer(_) => MessageType::Offer,
            Payload::Answer(_) => MessageType::Answer,
            Payload::IceCandidate(_) => MessageType::IceCandidate,
            Payload::MediaState { .. } => MessageType::MediaState,
            Payload::Error { .. } => MessageType::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalMessage {
    pub from: Option<ParticipantId>,
    pub to: Option<ParticipantId>,
    pub room_id: Option<RoomId>,
    pub timestamp: Option<u64>,
    pub payload: Payload,
}

impl SignalMessage {
    pub fn new(payload: Payload) -> Self {
        Self {
            from: None,
            to: None,
            room_id: None,
            timestamp: None,
            payload,
        }
    }

    pub fn sent_by(mut self, sender: ParticipantId) -> Self {
        self.from = Some(sender);
        self
    }

    pub fn addressed_to(mut self, recipient: ParticipantId) -> Self {
        self.to = Some(recipient);
        self
    }

    pub fn in_room(mut self, room_id: RoomId) -> Self {
        self.room_id = Some(room_id);
        self
    }

    pub fn at(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn message_type(&self) -> MessageType {
        self.payload.message_type()
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(&WireMessage::from(self))?)
    }

    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        let wire: WireMessage = serde_json::from_str(text)?;
        Self::try_from(wire)
    }
}
