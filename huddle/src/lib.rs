pub use huddle_core::{ParticipantId, RoomId};

pub mod model {
    pub use huddle_core::ProtocolError;
    pub use huddle_core::model::*;
    pub use huddle_core::utils::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use huddle_client::*;
}

#[cfg(feature = "relay")]
pub mod relay {
    pub use huddle_relay::*;
}
