use crate::error::CallError;
use crate::session::LocalMedia;
use huddle_core::SignalMessage;
use tokio::sync::{mpsc, oneshot};

/// Inputs to a running engine.
pub enum EngineCommand {
    Signal(SignalMessage),
    LocalMediaReady(LocalMedia),
    SignalingLost,
    Shutdown(oneshot::Sender<()>),
}

/// Sending side of a running engine's command channel.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineCommand>,
}

impl EngineHandle {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EngineCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn signal(&self, message: SignalMessage) -> bool {
        self.tx.send(EngineCommand::Signal(message)).is_ok()
    }

    pub fn set_local_media(&self, media: LocalMedia) -> bool {
        self.tx.send(EngineCommand::LocalMediaReady(media)).is_ok()
    }

    pub fn signaling_lost(&self) -> bool {
        self.tx.send(EngineCommand::SignalingLost).is_ok()
    }

    /// Closes every session and stops the engine. Resolves once it has.
    pub async fn shutdown(&self) -> Result<(), CallError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(EngineCommand::Shutdown(ack_tx))
            .map_err(|_| CallError::EngineStopped)?;
        ack_rx.await.map_err(|_| CallError::EngineStopped)
    }

    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }
}
