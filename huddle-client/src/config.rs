use crate::error::CallError;
use huddle_core::utils::DEFAULT_STUN_ADDR;
use huddle_core::{IceServerConfig, ParticipantId, RoomContext, RoomId};
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

pub const DEFAULT_SIGNALING_URL: &str = "ws://127.0.0.1:8080/ws";
pub const DEFAULT_ROOM_ID: &str = "DEFAULT";
pub const DEFAULT_JOIN_TIMEOUT_MS: u64 = 3000;

/// Everything a participant needs to enter a room.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    pub signaling_url: String,
    pub room_id: String,
    pub participant_id: String,
    pub display_name: String,
    pub ice_servers: Vec<IceServerConfig>,
    /// How long `Call::join` waits for `ROOM_JOINED` before carrying on.
    pub join_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let participant_id = Uuid::new_v4().simple().to_string();
        Self {
            signaling_url: DEFAULT_SIGNALING_URL.to_owned(),
            room_id: DEFAULT_ROOM_ID.to_owned(),
            display_name: format!("User_{}", &participant_id[..4]),
            participant_id,
            ice_servers: vec![IceServerConfig::stun(DEFAULT_STUN_ADDR)],
            join_timeout_ms: DEFAULT_JOIN_TIMEOUT_MS,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Overlays `HUDDLE_*` variables, as resolved by `lookup`, on the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("HUDDLE_SIGNALING_URL") {
            config.signaling_url = url;
        }
        if let Some(room) = lookup("HUDDLE_ROOM_ID") {
            config.room_id = room;
        }
        if let Some(name) = lookup("HUDDLE_DISPLAY_NAME") {
            config.display_name = name;
        }
        if let Some(stun) = lookup("HUDDLE_STUN_SERVER") {
            config.ice_servers = stun
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(IceServerConfig::stun)
                .collect();
        }
        if let Some(ms) = lookup("HUDDLE_JOIN_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            config.join_timeout_ms = ms;
        }

        config
    }

    pub fn validate(&self) -> Result<(), CallError> {
        if self.room_id.trim().is_empty() {
            return Err(CallError::Config("room id must not be empty".to_owned()));
        }
        if self.participant_id.trim().is_empty() {
            return Err(CallError::Config("participant id must not be empty".to_owned()));
        }
        if !(self.signaling_url.starts_with("ws://") || self.signaling_url.starts_with("wss://")) {
            return Err(CallError::Config(format!(
                "signaling url must use ws:// or wss://, got `{}`",
                self.signaling_url
            )));
        }
        Ok(())
    }

    pub fn room_context(&self) -> RoomContext {
        RoomContext::new(
            RoomId::from(self.room_id.as_str()),
            ParticipantId::from(self.participant_id.as_str()),
            self.display_name.as_str(),
        )
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn ice_server_urls(&self) -> Vec<String> {
        self.ice_servers
            .iter()
            .flat_map(|server| server.urls.iter().cloned())
            .collect()
    }
}
