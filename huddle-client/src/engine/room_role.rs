use crate::session::SessionRole;
use huddle_core::{ParticipantId, RoomSnapshot};

/// Our part in every negotiation for the room, fixed by the snapshot we got on entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomRole {
    /// First in the room. Offers to everyone who arrives later.
    Initiator,
    /// Arrived after others. Waits for their offers.
    Responder,
}

impl RoomRole {
    /// Empty snapshot means initiator. Our own record, if the relay echoes it, does not count.
    pub fn from_snapshot(snapshot: &RoomSnapshot, local_id: &ParticipantId) -> Self {
        let others = snapshot
            .participants
            .iter()
            .filter(|p| &p.user_id != local_id)
            .count();

        if others == 0 {
            RoomRole::Initiator
        } else {
            RoomRole::Responder
        }
    }

    pub fn initiates(self) -> bool {
        self == RoomRole::Initiator
    }
}

/// The role a new session takes when the room role creates it.
impl From<RoomRole> for SessionRole {
    fn from(role: RoomRole) -> Self {
        match role {
            RoomRole::Initiator => SessionRole::Initiator,
            RoomRole::Responder => SessionRole::Responder,
        }
    }
}
