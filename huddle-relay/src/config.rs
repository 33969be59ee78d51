use serde::Deserialize;
use std::net::SocketAddr;

pub const DEFAULT_MAX_PARTICIPANTS: usize = 10;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RelayConfig {
    pub bind: SocketAddr,
    pub max_participants: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_participants: DEFAULT_MAX_PARTICIPANTS,
        }
    }
}
