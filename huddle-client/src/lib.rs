pub mod config;
pub mod engine;
mod error;
pub mod room;
pub mod session;
pub mod signaling;

pub use config::ClientConfig;
pub use engine::{EngineEvent, EngineHandle, NegotiationEngine, RoomRole};
pub use error::{CallError, ConnectError, NegotiationError};
pub use room::{Call, CallEvent, Roster, RosterChange};
pub use session::{LocalMedia, PeerSession, PeerTransport, PeerTransportFactory};
pub use signaling::{EventKind, RoomSignaling, SignalEvent, SignalingClient, SignalingOutput};
