use huddle_core::{MessageType, ParticipantId};

/// Why a `connect()` did not reach the open state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    #[error("signaling connection closed before open")]
    ClosedBeforeOpen,

    #[error("signaling error during connect: {0}")]
    Handshake(String),

    #[error("invalid signaling url `{0}`")]
    InvalidUrl(String),
}

#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    #[error("failed to create peer transport for {participant}: {cause:#}")]
    TransportSetup {
        participant: ParticipantId,
        cause: anyhow::Error,
    },

    #[error("{step} failed for {participant}: {cause:#}")]
    Transport {
        participant: ParticipantId,
        step: &'static str,
        cause: anyhow::Error,
    },

    #[error("no session for {0}")]
    UnknownSession(ParticipantId),

    #[error("{0} without sender")]
    MissingSender(MessageType),
}

impl NegotiationError {
    pub(crate) fn transport(
        participant: &ParticipantId,
        step: &'static str,
        cause: anyhow::Error,
    ) -> Self {
        Self::Transport {
            participant: participant.clone(),
            step,
            cause,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("negotiation engine stopped")]
    EngineStopped,
}
