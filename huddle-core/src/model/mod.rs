mod ice;
mod participant;
mod room;
mod signaling;
mod wire;

pub use ice::IceServerConfig;
pub use participant::{MediaState, ParticipantId, ParticipantRecord};
pub use room::{RoomContext, RoomId};
pub use signaling::{IceCandidate, Payload, RoomSnapshot, SdpKind, SessionDescription, SignalMessage};
pub use wire::{MessageType, WireMessage};
