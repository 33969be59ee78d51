use crate::model::MessageType;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed signaling envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown message type `{0}`")]
    UnknownType(String),

    #[error("{0} message is missing its data payload")]
    MissingData(MessageType),

    #[error("invalid {kind} payload: {source}")]
    InvalidData {
        kind: MessageType,
        #[source]
        source: serde_json::Error,
    },
}
