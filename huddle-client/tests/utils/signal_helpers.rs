use anyhow::Result;
use huddle_client::LocalMedia;
use huddle_core::{
    IceCandidate, ParticipantId, ParticipantRecord, Payload, RoomSnapshot, SessionDescription,
    SignalMessage,
};
use huddle_relay::{RelayConfig, RelayService, serve};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use webrtc::api::media_engine::MIME_TYPE_OPUS;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

pub const TEST_ROOM: &str = "test-room";
pub const LOCAL_ID: &str = "local";

/// Timeout for conditions polled by `wait_until` (ms).
pub const WAIT_TIMEOUT_MS: u64 = 5000;

fn inbound(payload: Payload) -> SignalMessage {
    SignalMessage::new(payload).in_room(TEST_ROOM.into())
}

pub fn room_info(present: &[&str]) -> SignalMessage {
    let records = present
        .iter()
        .map(|id| ParticipantRecord::new((*id).into(), format!("{id}-name")))
        .collect();
    inbound(Payload::RoomInfo(RoomSnapshot::new(records))).addressed_to(LOCAL_ID.into())
}

pub fn user_joined(id: &str) -> SignalMessage {
    inbound(Payload::UserJoined {
        user_id: id.into(),
        name: format!("{id}-name"),
    })
    .sent_by(id.into())
}

pub fn user_left(id: &str) -> SignalMessage {
    inbound(Payload::UserLeft { user_id: id.into() }).sent_by(id.into())
}

pub fn offer_from(id: &str) -> SignalMessage {
    inbound(Payload::Offer(SessionDescription::offer(format!("offer-from-{id}"))))
        .sent_by(id.into())
        .addressed_to(LOCAL_ID.into())
}

pub fn answer_from(id: &str) -> SignalMessage {
    inbound(Payload::Answer(SessionDescription::answer(format!("answer-from-{id}"))))
        .sent_by(id.into())
        .addressed_to(LOCAL_ID.into())
}

pub fn candidate_from(id: &str, candidate: &str) -> SignalMessage {
    inbound(Payload::IceCandidate(IceCandidate::new(candidate)))
        .sent_by(id.into())
        .addressed_to(LOCAL_ID.into())
}

pub fn pid(id: &str) -> ParticipantId {
    ParticipantId::from(id)
}

/// One silent Opus track, enough for attachment bookkeeping.
pub fn test_media() -> LocalMedia {
    let track = Arc::new(TrackLocalStaticSample::new(
        RTCRtpCodecCapability {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            ..Default::default()
        },
        "audio".to_owned(),
        "huddle-test".to_owned(),
    ));
    LocalMedia::new(vec![track])
}

/// Starts a relay on an ephemeral local port.
pub async fn start_relay(config: RelayConfig) -> Result<(SocketAddr, RelayService)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let service = RelayService::new(config);

    tokio::spawn(serve(listener, service.clone()));
    Ok((addr, service))
}

/// Polls `condition` until it holds or the timeout passes.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(WAIT_TIMEOUT_MS);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
