use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier a participant announces in every signaling message it sends.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ParticipantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaState {
    pub audio_enabled: bool,
    pub video_enabled: bool,
}

impl Default for MediaState {
    fn default() -> Self {
        Self {
            audio_enabled: true,
            video_enabled: true,
        }
    }
}

/// One remote participant as announced by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRecord {
    pub user_id: ParticipantId,
    #[serde(default)]
    pub name: String,
    #[serde(default = "enabled")]
    pub audio_enabled: bool,
    #[serde(default = "enabled")]
    pub video_enabled: bool,
}

fn enabled() -> bool {
    true
}

impl ParticipantRecord {
    pub fn new(user_id: ParticipantId, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            audio_enabled: true,
            video_enabled: true,
        }
    }

    pub fn media(&self) -> MediaState {
        MediaState {
            audio_enabled: self.audio_enabled,
            video_enabled: self.video_enabled,
        }
    }

    pub fn set_media(&mut self, state: MediaState) {
        self.audio_enabled = state.audio_enabled;
        self.video_enabled = state.video_enabled;
    }
}
