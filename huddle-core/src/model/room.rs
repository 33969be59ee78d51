use crate::model::participant::ParticipantId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who we are and where we are. Fixed for as long as we stay in the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomContext {
    room_id: RoomId,
    local_id: ParticipantId,
    display_name: String,
}

impl RoomContext {
    pub fn new(room_id: RoomId, local_id: ParticipantId, display_name: impl Into<String>) -> Self {
        Self {
            room_id,
            local_id,
            display_name: display_name.into(),
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn local_id(&self) -> &ParticipantId {
        &self.local_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}
