use crate::engine::RoomRole;
use huddle_core::ParticipantId;
use std::fmt;
use std::sync::Arc;
use webrtc::track::track_remote::TrackRemote;

/// What the engine reports upward.
#[derive(Clone)]
pub enum EngineEvent {
    RoleDecided(RoomRole),
    RemoteTrack {
        participant: ParticipantId,
        track: Arc<TrackRemote>,
    },
    SessionConnected(ParticipantId),
    SessionClosed(ParticipantId),
    SessionFailed {
        participant: ParticipantId,
        reason: String,
    },
    SignalingLost,
}

impl fmt::Debug for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineEvent::RoleDecided(role) => f.debug_tuple("RoleDecided").field(role).finish(),
            EngineEvent::RemoteTrack { participant, track } => f
                .debug_struct("RemoteTrack")
                .field("participant", participant)
                .field("track", &track.id())
                .finish(),
            EngineEvent::SessionConnected(id) => f.debug_tuple("SessionConnected").field(id).finish(),
            EngineEvent::SessionClosed(id) => f.debug_tuple("SessionClosed").field(id).finish(),
            EngineEvent::SessionFailed {
                participant,
                reason,
            } => f
                .debug_struct("SessionFailed")
                .field("participant", participant)
                .field("reason", reason)
                .finish(),
            EngineEvent::SignalingLost => f.write_str("SignalingLost"),
        }
    }
}
