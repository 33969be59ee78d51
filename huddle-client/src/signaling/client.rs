use crate::error::ConnectError;
use crate::signaling::events::{EventKind, Listeners, SignalEvent, SubscriptionId, publish};
use futures::future::{BoxFuture, Shared};
use futures::{FutureExt, SinkExt, StreamExt};
use huddle_core::SignalMessage;
use huddle_core::utils::now_millis;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

type PendingConnect = Shared<BoxFuture<'static, Result<(), ConnectError>>>;

enum Phase {
    Idle,
    Connecting(PendingConnect),
    Open(mpsc::UnboundedSender<Message>),
}

struct Link {
    phase: Phase,
    shutdown: Option<oneshot::Sender<()>>,
    generation: u64,
}

struct ClientInner {
    url: String,
    link: Mutex<Link>,
    listeners: Mutex<Listeners>,
    last_timestamp: AtomicU64,
}

/// One logical connection to the signaling relay.
///
/// Cloning is cheap and every clone drives the same socket. A background task
/// owns the socket; the client only hands it outbound frames and a shutdown
/// signal.
#[derive(Clone)]
pub struct SignalingClient {
    inner: Arc<ClientInner>,
}

impl SignalingClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                url: url.into(),
                link: Mutex::new(Link {
                    phase: Phase::Idle,
                    shutdown: None,
                    generation: 0,
                }),
                listeners: Mutex::new(Listeners::default()),
                last_timestamp: AtomicU64::new(0),
            }),
        }
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Resolves once the socket is open.
    ///
    /// Concurrent callers share one attempt; a call made while already open
    /// resolves immediately.
    pub async fn connect(&self) -> Result<(), ConnectError> {
        let url = &self.inner.url;
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(ConnectError::InvalidUrl(url.clone()));
        }

        let pending = {
            let mut link = self.inner.link();
            let in_flight = match &link.phase {
                Phase::Open(_) => {
                    debug!("Signaling already connected");
                    return Ok(());
                }
                Phase::Connecting(pending) => {
                    debug!("Joining connect already in progress");
                    Some(pending.clone())
                }
                Phase::Idle => None,
            };
            match in_flight {
                Some(pending) => pending,
                None => self.start_connect(&mut link),
            }
        };

        pending.await
    }

    fn start_connect(&self, link: &mut Link) -> PendingConnect {
        let (done_tx, done_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let pending = done_rx
            .map(|res| res.unwrap_or(Err(ConnectError::ClosedBeforeOpen)))
            .boxed()
            .shared();

        link.generation += 1;
        link.phase = Phase::Connecting(pending.clone());
        link.shutdown = Some(shutdown_tx);

        info!("Connecting to signaling relay at {}", self.inner.url);
        tokio::spawn(drive(
            self.inner.clone(),
            link.generation,
            done_tx,
            shutdown_rx,
        ));

        pending
    }

    /// Closes the socket. Safe at any time, including while a connect is pending.
    ///
    /// An open link reads as idle from here on, so a following `connect`
    /// opens a fresh socket instead of reusing the closing one.
    pub fn disconnect(&self) {
        let shutdown = {
            let mut link = self.inner.link();
            if matches!(link.phase, Phase::Open(_)) {
                link.phase = Phase::Idle;
            }
            link.shutdown.take()
        };
        match shutdown {
            Some(tx) => {
                info!("Closing signaling connection");
                let _ = tx.send(());
            }
            None => debug!("Disconnect requested while signaling is idle"),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.inner.link().phase, Phase::Open(_))
    }

    /// Stamps and queues `message`. Logs and drops it when the socket is not open.
    pub fn send(&self, message: SignalMessage) {
        let outbound = match &self.inner.link().phase {
            Phase::Open(tx) => tx.clone(),
            _ => {
                warn!(
                    "Signaling not connected, dropping {} message",
                    message.message_type()
                );
                return;
            }
        };

        let message = message.at(self.inner.next_timestamp());
        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to encode {} message: {}", message.message_type(), e);
                return;
            }
        };

        debug!("Sending {} message", message.message_type());
        if outbound.send(Message::Text(json)).is_err() {
            warn!("Signaling closed while sending {}", message.message_type());
        }
    }

    pub fn subscribe(
        &self,
        kind: EventKind,
        handler: impl Fn(&SignalEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.inner.listeners().add(kind, Arc::new(handler))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.listeners().remove(id)
    }

    /// Subscribes with a channel instead of a callback.
    pub fn events(&self, kind: EventKind) -> (SubscriptionId, mpsc::UnboundedReceiver<SignalEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.subscribe(kind, move |event| {
            let _ = tx.send(event.clone());
        });
        (id, rx)
    }
}

impl ClientInner {
    fn link(&self) -> MutexGuard<'_, Link> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> MutexGuard<'_, Listeners> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: &SignalEvent) {
        publish(&self.listeners, event);
    }

    fn next_timestamp(&self) -> u64 {
        let now = now_millis();
        self.last_timestamp.fetch_max(now, Ordering::Relaxed).max(now)
    }

    fn handle_text(&self, text: &str) {
        match SignalMessage::from_json(text) {
            Ok(msg) => {
                debug!("Received {} message", msg.message_type());
                self.publish(&SignalEvent::Message(msg));
            }
            Err(e) => warn!("Dropping undecodable signaling frame: {}", e),
        }
    }

    /// Back to idle, then the one closed notification for this attempt.
    fn finish(&self, generation: u64) {
        {
            let mut link = self.link();
            if link.generation == generation {
                link.phase = Phase::Idle;
                link.shutdown = None;
            }
        }
        info!("Signaling disconnected");
        self.publish(&SignalEvent::Disconnected);
    }
}

async fn drive(
    inner: Arc<ClientInner>,
    generation: u64,
    done: oneshot::Sender<Result<(), ConnectError>>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let handshake = tokio::select! {
        res = connect_async(inner.url.as_str()) => res,
        _ = &mut shutdown => {
            warn!("Signaling closed before open");
            let _ = done.send(Err(ConnectError::ClosedBeforeOpen));
            inner.finish(generation);
            return;
        }
    };

    let ws = match handshake {
        Ok((ws, _)) => ws,
        Err(e) => {
            error!("Signaling error during connect: {}", e);
            inner.publish(&SignalEvent::Error(e.to_string()));
            let _ = done.send(Err(ConnectError::Handshake(e.to_string())));
            inner.finish(generation);
            return;
        }
    };

    let (mut write, mut read) = ws.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel();

    inner.link().phase = Phase::Open(out_tx);
    info!("Signaling connected to {}", inner.url);
    inner.publish(&SignalEvent::Connected);
    let _ = done.send(Ok(()));

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => inner.handle_text(&text),
                Some(Ok(Message::Close(frame))) => {
                    info!("Relay closed signaling connection: {:?}", frame);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("Signaling socket error: {}", e);
                    inner.publish(&SignalEvent::Error(e.to_string()));
                    break;
                }
                None => break,
            },

            outbound = out_rx.recv() => match outbound {
                Some(msg) => {
                    if let Err(e) = write.send(msg).await {
                        error!("Failed to write signaling frame: {}", e);
                        inner.publish(&SignalEvent::Error(e.to_string()));
                        break;
                    }
                }
                // Everything queued before disconnect has been written.
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },

            _ = &mut shutdown => {
                while let Ok(msg) = out_rx.try_recv() {
                    if write.send(msg).await.is_err() {
                        break;
                    }
                }
                let _ = write.send(Message::Close(None)).await;
                break;
            }
        }
    }

    inner.finish(generation);
}
