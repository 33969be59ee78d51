use huddle_core::{ParticipantId, ParticipantRecord, Payload, SignalMessage};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// How one message changed the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterChange {
    Joined,
    Snapshot(usize),
    Added(ParticipantRecord),
    Removed(ParticipantId),
    MediaChanged(ParticipantRecord),
    Error(String),
    Unchanged,
}

/// Who else is in the room, as far as the relay has told us.
#[derive(Debug, Clone)]
pub struct Roster {
    local_id: ParticipantId,
    participants: BTreeMap<ParticipantId, ParticipantRecord>,
    joined: bool,
    last_error: Option<String>,
}

impl Roster {
    pub fn new(local_id: ParticipantId) -> Self {
        Self {
            local_id,
            participants: BTreeMap::new(),
            joined: false,
            last_error: None,
        }
    }

    pub fn apply(&mut self, msg: &SignalMessage) -> RosterChange {
        match &msg.payload {
            Payload::RoomJoined => {
                self.joined = true;
                RosterChange::Joined
            }
            Payload::RoomInfo(snapshot) => {
                self.participants = snapshot
                    .participants
                    .iter()
                    .filter(|p| p.user_id != self.local_id)
                    .map(|p| (p.user_id.clone(), p.clone()))
                    .collect();
                RosterChange::Snapshot(self.participants.len())
            }
            Payload::UserJoined { user_id, name } => {
                if *user_id == self.local_id || self.participants.contains_key(user_id) {
                    debug!("{} already in roster", user_id);
                    return RosterChange::Unchanged;
                }
                let record = ParticipantRecord::new(user_id.clone(), name.as_str());
                self.participants.insert(user_id.clone(), record.clone());
                RosterChange::Added(record)
            }
            Payload::UserLeft { user_id } => self.remove(user_id),
            Payload::MediaState { user_id, state } => {
                let Some(id) = user_id.as_ref().or(msg.from.as_ref()) else {
                    return RosterChange::Unchanged;
                };
                match self.participants.get_mut(id) {
                    Some(record) => {
                        record.set_media(*state);
                        RosterChange::MediaChanged(record.clone())
                    }
                    None => RosterChange::Unchanged,
                }
            }
            Payload::Error { error } => {
                warn!("Relay reported error: {}", error);
                self.last_error = Some(error.clone());
                RosterChange::Error(error.clone())
            }
            Payload::Join { .. }
            | Payload::Leave
            | Payload::Offer(_)
            | Payload::Answer(_)
            | Payload::IceCandidate(_) => RosterChange::Unchanged,
        }
    }

    /// Drops a participant whose session failed. The relay may never send `USER_LEFT` for them.
    pub fn remove(&mut self, id: &ParticipantId) -> RosterChange {
        match self.participants.remove(id) {
            Some(_) => RosterChange::Removed(id.clone()),
            None => RosterChange::Unchanged,
        }
    }

    pub fn participants(&self) -> Vec<ParticipantRecord> {
        self.participants.values().cloned().collect()
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&ParticipantRecord> {
        self.participants.get(id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn is_joined(&self) -> bool {
        self.joined
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
