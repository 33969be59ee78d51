use crate::error::ProtocolError;
use crate::model::participant::{MediaState, ParticipantId};
use crate::model::signaling::{
    IceCandidate, Payload, RoomSnapshot, SdpKind, SessionDescription, SignalMessage,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Join,
    Leave,
    RoomJoined,
    RoomInfo,
    UserJoined,
    UserLeft,
    Offer,
    Answer,
    IceCandidate,
    MediaState,
    Error,
}

impl MessageType {
    pub const ALL: [MessageType; 11] = [
        MessageType::Join,
        MessageType::Leave,
        MessageType::RoomJoined,
        MessageType::RoomInfo,
        MessageType::UserJoined,
        MessageType::UserLeft,
        MessageType::Offer,
        MessageType::Answer,
        MessageType::IceCandidate,
        MessageType::MediaState,
        MessageType::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Join => "JOIN",
            MessageType::Leave => "LEAVE",
            MessageType::RoomJoined => "ROOM_JOINED",
            MessageType::RoomInfo => "ROOM_INFO",
            MessageType::UserJoined => "USER_JOINED",
            MessageType::UserLeft => "USER_LEFT",
            MessageType::Offer => "OFFER",
            MessageType::Answer => "ANSWER",
            MessageType::IceCandidate => "ICE_CANDIDATE",
            MessageType::MediaState => "MEDIA_STATE",
            MessageType::Error => "ERROR",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownType(s.to_owned()))
    }
}

/// The JSON envelope exactly as it travels over the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

#[derive(Deserialize, Default)]
struct JoinData {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserJoinedData {
    user_id: ParticipantId,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserLeftData {
    user_id: ParticipantId,
}

#[derive(Deserialize)]
struct SdpData {
    sdp: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaStateData {
    #[serde(default)]
    user_id: Option<ParticipantId>,
    #[serde(default = "enabled")]
    audio_enabled: bool,
    #[serde(default = "enabled")]
    video_enabled: bool,
}

#[derive(Deserialize, Default)]
struct ErrorData {
    #[serde(default)]
    error: Option<String>,
}

fn enabled() -> bool {
    true
}

fn required<T: DeserializeOwned>(kind: MessageType, data: Option<Value>) -> Result<T, ProtocolError> {
    match data {
        None | Some(Value::Null) => Err(ProtocolError::MissingData(kind)),
        Some(value) => serde_json::from_value(value)
            .map_err(|source| ProtocolError::InvalidData { kind, source }),
    }
}

fn optional<T: DeserializeOwned + Default>(
    kind: MessageType,
    data: Option<Value>,
) -> Result<T, ProtocolError> {
    match data {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value)
            .map_err(|source| ProtocolError::InvalidData { kind, source }),
    }
}

impl TryFrom<WireMessage> for SignalMessage {
    type Error = ProtocolError;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        let kind: MessageType = wire.kind.parse()?;

        let payload = match kind {
            MessageType::Join => {
                let data: JoinData = optional(kind, wire.data)?;
                Payload::Join { name: data.name }
            }
            MessageType::Leave => Payload::Leave,
            MessageType::RoomJoined => Payload::RoomJoined,
            MessageType::RoomInfo => Payload::RoomInfo(optional::<RoomSnapshot>(kind, wire.data)?),
            MessageType::UserJoined => {
                let data: UserJoinedData = required(kind, wire.data)?;
                Payload::UserJoined {
                    user_id: data.user_id,
                    name: data.name,
                }
            }
            MessageType::UserLeft => {
                let data: UserLeftData = required(kind, wire.data)?;
                Payload::UserLeft {
                    user_id: data.user_id,
                }
            }
            MessageType::Offer => {
                let data: SdpData = required(kind, wire.data)?;
                Payload::Offer(SessionDescription::offer(data.sdp))
            }
            MessageType::Answer => {
                let data: SdpData = required(kind, wire.data)?;
                Payload::Answer(SessionDescription::answer(data.sdp))
            }
            MessageType::IceCandidate => {
                Payload::IceCandidate(required::<IceCandidate>(kind, wire.data)?)
            }
            MessageType::MediaState => {
                let data: MediaStateData = required(kind, wire.data)?;
                Payload::MediaState {
                    user_id: data.user_id,
                    state: MediaState {
                        audio_enabled: data.audio_enabled,
                        video_enabled: data.video_enabled,
                    },
                }
            }
            MessageType::Error => {
                let data: ErrorData = optional(kind, wire.data)?;
                let error = data
                    .error
                    .or(wire.error)
                    .unwrap_or_else(|| "An error occurred".to_owned());
                Payload::Error { error }
            }
        };

        Ok(SignalMessage {
            from: wire.from.map(ParticipantId::from),
            to: wire.to.map(ParticipantId::from),
            room_id: wire.room_id.map(Into::into),
            timestamp: wire.timestamp,
            payload,
        })
    }
}

fn sdp_data(desc: &SessionDescription) -> Value {
    let kind = match desc.kind {
        SdpKind::Offer => "offer",
        SdpKind::Answer => "answer",
    };
    json!({ "sdp": desc.sdp, "type": kind })
}

impl From<&SignalMessage> for WireMessage {
    fn from(msg: &SignalMessage) -> Self {
        let mut error = None;

        let data = match &msg.payload {
            Payload::Join { name } => Some(json!({ "name": name })),
            Payload::Leave | Payload::RoomJoined => None,
            Payload::RoomInfo(snapshot) => serde_json::to_value(snapshot).ok(),
            Payload::UserJoined { user_id, name } => {
                Some(json!({ "userId": user_id, "name": name }))
            }
            Payload::UserLeft { user_id } => Some(json!({ "userId": user_id })),
            Payload::Offer(desc) | Payload::Answer(desc) => Some(sdp_data(desc)),
            Payload::IceCandidate(candidate) => serde_json::to_value(candidate).ok(),
            Payload::MediaState { user_id, state } => {
                let mut value = json!({
                    "audioEnabled": state.audio_enabled,
                    "videoEnabled": state.video_enabled,
                });
                if let (Some(user_id), Some(map)) = (user_id, value.as_object_mut()) {
                    map.insert("userId".to_owned(), json!(user_id));
                }
                Some(value)
            }
            Payload::Error { error: text } => {
                error = Some(text.clone());
                Some(json!({ "error": text }))
            }
        };

        Self {
            kind: msg.message_type().as_str().to_owned(),
            from: msg.from.as_ref().map(|id| id.as_str().to_owned()),
            to: msg.to.as_ref().map(|id| id.as_str().to_owned()),
            room_id: msg.room_id.as_ref().map(|id| id.as_str().to_owned()),
            data,
            error,
            timestamp: msg.timestamp,
        }
    }
}
