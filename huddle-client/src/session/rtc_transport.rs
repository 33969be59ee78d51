use crate::session::{
    ConnectionStatus, LocalMedia, PeerTransport, PeerTransportFactory, SessionEvent, SessionSink,
    SignalingStatus,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use huddle_core::{IceCandidate, IceServerConfig, ParticipantId, SdpKind, SessionDescription};
use std::sync::Arc;
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_remote::TrackRemote;

/// Builds webrtc-rs peer connections against a fixed ICE server list.
#[derive(Debug, Clone)]
pub struct RtcTransportFactory {
    ice_servers: Vec<IceServerConfig>,
}

impl RtcTransportFactory {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self { ice_servers }
    }
}

#[async_trait]
impl PeerTransportFactory for RtcTransportFactory {
    async fn create(
        &self,
        participant: &ParticipantId,
        sink: SessionSink,
    ) -> Result<Box<dyn PeerTransport>> {
        let transport = RtcPeerTransport::new(&self.ice_servers, sink)
            .await
            .with_context(|| format!("Failed to build peer connection for {}", participant))?;
        Ok(Box::new(transport))
    }
}

pub struct RtcPeerTransport {
    peer_connection: Arc<RTCPeerConnection>,
}

impl RtcPeerTransport {
    pub async fn new(ice_servers: &[IceServerConfig], sink: SessionSink) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_sink = sink.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let sink = state_sink.clone();
                Box::pin(async move {
                    info!("Peer connection with {} is {:?}", sink.participant(), s);
                    if let Some(status) = connection_status(s) {
                        sink.emit(SessionEvent::ConnectionChanged(status));
                    }
                })
            },
        ));

        let ice_sink = sink.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let sink = ice_sink.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                sink.emit(SessionEvent::LocalCandidate(IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                }));
            })
        }));

        let track_sink = sink;
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let sink = track_sink.clone();
                Box::pin(async move {
                    debug!(
                        "Remote {:?} track {} from {}",
                        track.kind(),
                        track.id(),
                        sink.participant()
                    );
                    sink.emit(SessionEvent::RemoteTrack(track));
                })
            },
        ));

        Ok(Self { peer_connection })
    }
}

fn connection_status(state: RTCPeerConnectionState) -> Option<ConnectionStatus> {
    match state {
        RTCPeerConnectionState::New => Some(ConnectionStatus::New),
        RTCPeerConnectionState::Connecting => Some(ConnectionStatus::Connecting),
        RTCPeerConnectionState::Connected => Some(ConnectionStatus::Connected),
        RTCPeerConnectionState::Disconnected => Some(ConnectionStatus::Disconnected),
        RTCPeerConnectionState::Failed => Some(ConnectionStatus::Failed),
        RTCPeerConnectionState::Closed => Some(ConnectionStatus::Closed),
        RTCPeerConnectionState::Unspecified => None,
    }
}

#[async_trait]
impl PeerTransport for RtcPeerTransport {
    fn signaling_status(&self) -> SignalingStatus {
        match self.peer_connection.signaling_state() {
            RTCSignalingState::Unspecified | RTCSignalingState::Stable => SignalingStatus::Stable,
            RTCSignalingState::HaveLocalOffer => SignalingStatus::HaveLocalOffer,
            RTCSignalingState::HaveRemoteOffer => SignalingStatus::HaveRemoteOffer,
            RTCSignalingState::HaveLocalPranswer => SignalingStatus::HaveLocalPranswer,
            RTCSignalingState::HaveRemotePranswer => SignalingStatus::HaveRemotePranswer,
            RTCSignalingState::Closed => SignalingStatus::Closed,
        }
    }

    async fn sender_count(&self) -> usize {
        let mut count = 0;
        for sender in self.peer_connection.get_senders().await {
            if sender.track().await.is_some() {
                count += 1;
            }
        }
        count
    }

    async fn add_tracks(&self, media: &LocalMedia) -> Result<()> {
        for track in media.tracks() {
            let sender = self
                .peer_connection
                .add_track(track.clone())
                .await
                .with_context(|| format!("Failed to add local track {}", track.id()))?;

            // RTCP has to be drained for the interceptors to work.
            tokio::spawn(async move {
                let mut buf = vec![0u8; 1500];
                while sender.read(&mut buf).await.is_ok() {}
            });
        }
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        let desc = match description.kind {
            SdpKind::Offer => RTCSessionDescription::offer(description.sdp)?,
            SdpKind::Answer => RTCSessionDescription::answer(description.sdp)?,
        };
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let rollback: RTCSessionDescription =
            serde_json::from_value(serde_json::json!({ "type": "rollback", "sdp": "" }))
                .context("Failed to build rollback description")?;
        self.peer_connection.set_local_description(rollback).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: None,
        };
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}
