use anyhow::Result;
use async_trait::async_trait;
use huddle_core::{IceCandidate, ParticipantId, SessionDescription};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_remote::TrackRemote;

/// Offer/answer status of the underlying transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingStatus {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    HaveLocalPranswer,
    HaveRemotePranswer,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Something the transport reported on its own.
#[derive(Clone)]
pub enum SessionEvent {
    LocalCandidate(IceCandidate),
    RemoteTrack(Arc<TrackRemote>),
    ConnectionChanged(ConnectionStatus),
}

impl fmt::Debug for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::LocalCandidate(c) => f.debug_tuple("LocalCandidate").field(c).finish(),
            SessionEvent::RemoteTrack(track) => f.debug_tuple("RemoteTrack").field(&track.id()).finish(),
            SessionEvent::ConnectionChanged(s) => f.debug_tuple("ConnectionChanged").field(s).finish(),
        }
    }
}

/// A `SessionEvent` tagged with the session it came from.
#[derive(Debug, Clone)]
pub struct SessionUpdate {
    pub participant: ParticipantId,
    pub session_id: u64,
    pub event: SessionEvent,
}

/// Where a transport reports its events. Sealed once its session starts closing,
/// after which nothing gets through.
#[derive(Clone)]
pub struct SessionSink {
    participant: ParticipantId,
    session_id: u64,
    sealed: Arc<AtomicBool>,
    tx: mpsc::UnboundedSender<SessionUpdate>,
}

impl SessionSink {
    pub fn new(
        participant: ParticipantId,
        session_id: u64,
        tx: mpsc::UnboundedSender<SessionUpdate>,
    ) -> Self {
        Self {
            participant,
            session_id,
            sealed: Arc::new(AtomicBool::new(false)),
            tx,
        }
    }

    pub fn participant(&self) -> &ParticipantId {
        &self.participant
    }

    /// Returns false when the event was dropped.
    pub fn emit(&self, event: SessionEvent) -> bool {
        if self.is_sealed() {
            return false;
        }
        self.tx
            .send(SessionUpdate {
                participant: self.participant.clone(),
                session_id: self.session_id,
                event,
            })
            .is_ok()
    }

    pub fn seal(&self) {
        self.sealed.store(true, Ordering::SeqCst);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::SeqCst)
    }
}

pub type LocalTrack = Arc<dyn TrackLocal + Send + Sync>;

/// The local tracks every new session gets. Shared, never copied.
#[derive(Clone, Default)]
pub struct LocalMedia {
    tracks: Arc<Vec<LocalTrack>>,
}

impl LocalMedia {
    pub fn new(tracks: Vec<LocalTrack>) -> Self {
        Self {
            tracks: Arc::new(tracks),
        }
    }

    /// An Opus and a VP8 track that never carry samples. Enough to negotiate
    /// send-capable media without a capture device.
    pub fn placeholder(stream_id: &str) -> Self {
        let track = |mime_type: &str, kind: &str| -> LocalTrack {
            Arc::new(TrackLocalStaticSample::new(
                RTCRtpCodecCapability {
                    mime_type: mime_type.to_owned(),
                    ..Default::default()
                },
                kind.to_owned(),
                stream_id.to_owned(),
            ))
        };
        Self::new(vec![track(MIME_TYPE_OPUS, "audio"), track(MIME_TYPE_VP8, "video")])
    }

    pub fn tracks(&self) -> &[LocalTrack] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl fmt::Debug for LocalMedia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.tracks.iter().map(|t| t.id()).collect();
        f.debug_struct("LocalMedia").field("tracks", &ids).finish()
    }
}

/// One peer-to-peer transport with one remote participant.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    fn signaling_status(&self) -> SignalingStatus;

    /// Senders that currently carry a track.
    async fn sender_count(&self) -> usize;

    async fn add_tracks(&self, media: &LocalMedia) -> Result<()>;

    /// Creates an offer and applies it as the local description.
    async fn create_offer(&self) -> Result<SessionDescription>;

    /// Creates an answer and applies it as the local description.
    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()>;

    /// Drops a half-finished local offer.
    async fn rollback(&self) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait PeerTransportFactory: Send + Sync {
    async fn create(
        &self,
        participant: &ParticipantId,
        sink: SessionSink,
    ) -> Result<Box<dyn PeerTransport>>;
}
