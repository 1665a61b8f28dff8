//! Native WebRTC stack over webrtc-rs.
//!
//! [`NativePeerFactory`] opens `RTCPeerConnection`s with Opus and the default
//! interceptors. [`NativeMedia`] hands out Opus sample tracks: microphone tracks go to
//! the application's capture loop, which writes encoded frames into them, and the
//! silent track pumps Opus silence on its own.

use crate::transport::peer::{
    AudioConstraints, AudioTrack, BoxFuture, ConnectionState, DataChannel, MediaDevices,
    PeerConfig, PeerConnection, PeerEvent, PeerFactory, TrackSender,
};
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;

use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MediaEngine, MIME_TYPE_OPUS};
use webrtc::api::APIBuilder;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::media::Sample;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;

/// One 20 ms Opus frame of silence.
const OPUS_SILENCE: [u8; 3] = [0xf8, 0xff, 0xfe];
pub const OPUS_FRAME: Duration = Duration::from_millis(20);
const STREAM_ID: &str = "rt-whiteboard";

impl From<RTCPeerConnectionState> for ConnectionState {
    fn from(state: RTCPeerConnectionState) -> Self {
        match state {
            RTCPeerConnectionState::Connecting => Self::Connecting,
            RTCPeerConnectionState::Connected => Self::Connected,
            RTCPeerConnectionState::Disconnected => Self::Disconnected,
            RTCPeerConnectionState::Failed => Self::Failed,
            RTCPeerConnectionState::Closed => Self::Closed,
            _ => Self::New,
        }
    }
}

/// Opus track backed by a `TrackLocalStaticSample`.
pub struct NativeTrack {
    id: String,
    local: Arc<TrackLocalStaticSample>,
    stopped: AtomicBool,
}

impl NativeTrack {
    #[must_use]
    pub fn opus(id: impl Into<String>) -> Self {
        let id = id.into();
        let local = TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                ..Default::default()
            },
            id.clone(),
            STREAM_ID.to_owned(),
        );
        Self {
            id,
            local: Arc::new(local),
            stopped: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Write one encoded Opus frame.
    ///
    /// # Errors
    /// `ConnectionClosed` once the track is stopped, or the stack's write error.
    pub async fn write_opus(&self, frame: Bytes, duration: Duration) -> Result<()> {
        if self.is_stopped() {
            return Err(Error::ConnectionClosed);
        }
        self.local
            .write_sample(&Sample { data: frame, duration, ..Default::default() })
            .await?;
        Ok(())
    }

    fn local(&self) -> Arc<dyn TrackLocal + Send + Sync> {
        Arc::clone(&self.local) as Arc<dyn TrackLocal + Send + Sync>
    }
}

impl fmt::Debug for NativeTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeTrack")
            .field("id", &self.id)
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}

impl AudioTrack for NativeTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn local_track(track: &dyn AudioTrack) -> Result<Arc<dyn TrackLocal + Send + Sync>> {
    track
        .as_any()
        .downcast_ref::<NativeTrack>()
        .map(NativeTrack::local)
        .ok_or_else(|| Error::MediaAccess(format!("track {} was not created by NativeMedia", track.id())))
}

/// Microphone and silence sources for [`NativePeerFactory`].
pub struct NativeMedia {
    captures: mpsc::UnboundedSender<Arc<NativeTrack>>,
}

impl NativeMedia {
    /// Media devices plus the receiver of every microphone track they open.
    ///
    /// The application's capture loop takes each track from the receiver and feeds it
    /// with [`NativeTrack::write_opus`] until [`NativeTrack::is_stopped`].
    #[must_use]
    pub fn with_capture() -> (Self, mpsc::UnboundedReceiver<Arc<NativeTrack>>) {
        let (captures, receiver) = mpsc::unbounded_channel();
        (Self { captures }, receiver)
    }
}

#[async_trait]
impl MediaDevices for NativeMedia {
    async fn microphone(&self, constraints: AudioConstraints) -> Result<Arc<dyn AudioTrack>> {
        tracing::debug!(?constraints, "Opening microphone track");
        let track = Arc::new(NativeTrack::opus(format!("microphone-{}", uuid::Uuid::new_v4())));
        self.captures
            .send(Arc::clone(&track))
            .map_err(|_| Error::MediaAccess("no microphone capture attached".to_string()))?;
        Ok(track)
    }

    fn silent_track(&self) -> Arc<dyn AudioTrack> {
        let track = Arc::new(NativeTrack::opus(format!("silence-{}", uuid::Uuid::new_v4())));
        tokio::spawn(pump_silence(Arc::downgrade(&track)));
        track
    }
}

async fn pump_silence(track: Weak<NativeTrack>) {
    let mut ticker = tokio::time::interval(OPUS_FRAME);
    loop {
        ticker.tick().await;
        let Some(track) = track.upgrade() else { break };
        if track.is_stopped() {
            break;
        }
        if let Err(err) = track.write_opus(Bytes::from_static(&OPUS_SILENCE), OPUS_FRAME).await {
            tracing::trace!("Silence frame dropped: {err}");
        }
    }
}

/// Data channel whose writes are queued to a writer task, keeping message order.
pub struct NativeChannel {
    label: String,
    inner: Arc<RTCDataChannel>,
    outgoing: mpsc::UnboundedSender<String>,
}

impl NativeChannel {
    fn new(inner: Arc<RTCDataChannel>, events: &mpsc::UnboundedSender<PeerEvent>) -> Self {
        let opened = events.clone();
        inner.on_open(Box::new(move || {
            let _ = opened.send(PeerEvent::ChannelOpen);
            Box::pin(async {})
        }));

        let messages = events.clone();
        inner.on_message(Box::new(move |message: DataChannelMessage| {
            let event = match String::from_utf8(message.data.to_vec()) {
                Ok(text) => PeerEvent::ChannelMessage(text),
                Err(err) => PeerEvent::ChannelError(format!("non-UTF-8 message: {err}")),
            };
            let _ = messages.send(event);
            Box::pin(async {})
        }));

        let closed = events.clone();
        inner.on_close(Box::new(move || {
            let _ = closed.send(PeerEvent::ChannelClosed);
            Box::pin(async {})
        }));

        let errors = events.clone();
        inner.on_error(Box::new(move |err| {
            let _ = errors.send(PeerEvent::ChannelError(err.to_string()));
            Box::pin(async {})
        }));

        let (outgoing, mut queue) = mpsc::unbounded_channel::<String>();
        let writer = Arc::clone(&inner);
        tokio::spawn(async move {
            while let Some(text) = queue.recv().await {
                if let Err(err) = writer.send_text(text).await {
                    tracing::warn!("Data channel write failed: {err}");
                }
            }
        });

        Self {
            label: inner.label().to_string(),
            inner,
            outgoing,
        }
    }
}

impl DataChannel for NativeChannel {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_open(&self) -> bool {
        self.inner.ready_state() == RTCDataChannelState::Open
    }

    fn send_text(&self, text: String) -> Result<()> {
        self.outgoing.send(text).map_err(|_| Error::ChannelUnavailable)
    }

    fn close(&self) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            if let Err(err) = inner.close().await {
                tracing::debug!("Data channel close failed: {err}");
            }
        });
    }
}

pub struct NativePeer {
    inner: Arc<RTCPeerConnection>,
    senders: Vec<Arc<RTCRtpSender>>,
    events_tx: mpsc::UnboundedSender<PeerEvent>,
    events: mpsc::UnboundedReceiver<PeerEvent>,
}

impl PeerConnection for NativePeer {
    fn add_track(&mut self, track: Arc<dyn AudioTrack>) -> BoxFuture<'_, Result<TrackSender>> {
        Box::pin(async move {
            let local = local_track(track.as_ref())?;
            let sender = self.inner.add_track(local).await?;

            // RTCP must be read for the interceptors to run.
            let rtcp = Arc::clone(&sender);
            tokio::spawn(async move {
                let mut buf = vec![0u8; 1500];
                while rtcp.read(&mut buf).await.is_ok() {}
            });

            self.senders.push(sender);
            Ok(TrackSender(self.senders.len() - 1))
        })
    }

    fn replace_track(&mut self, sender: TrackSender, track: Arc<dyn AudioTrack>) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let local = local_track(track.as_ref())?;
            let sender = self
                .senders
                .get(sender.0)
                .ok_or_else(|| Error::MediaAccess(format!("unknown track sender {}", sender.0)))?;
            sender.replace_track(Some(local)).await?;
            Ok(())
        })
    }

    fn create_data_channel(&mut self, label: String) -> BoxFuture<'_, Result<Arc<dyn DataChannel>>> {
        Box::pin(async move {
            let inner = self.inner.create_data_channel(&label, None).await?;
            let channel: Arc<dyn DataChannel> = Arc::new(NativeChannel::new(inner, &self.events_tx));
            Ok(channel)
        })
    }

    fn create_offer(&mut self) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move { Ok(self.inner.create_offer(None).await?.sdp) })
    }

    fn set_local_description(&mut self, sdp: String) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let offer = RTCSessionDescription::offer(sdp)?;
            self.inner.set_local_description(offer).await?;
            Ok(())
        })
    }

    fn set_remote_description(&mut self, sdp: String) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let answer = RTCSessionDescription::answer(sdp)?;
            self.inner.set_remote_description(answer).await?;
            Ok(())
        })
    }

    fn next_event(&mut self) -> BoxFuture<'_, Option<PeerEvent>> {
        Box::pin(async move { self.events.recv().await })
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if let Err(err) = self.inner.close().await {
                tracing::debug!("Peer connection close failed: {err}");
            }
        })
    }
}

/// Opens webrtc-rs peer connections.
#[derive(Default)]
pub struct NativePeerFactory {
    remote_audio: Option<mpsc::UnboundedSender<Bytes>>,
}

impl NativePeerFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward the Opus payloads of the model's audio track to `sink`.
    #[must_use]
    pub fn with_remote_audio(mut self, sink: mpsc::UnboundedSender<Bytes>) -> Self {
        self.remote_audio = Some(sink);
        self
    }
}

#[async_trait]
impl PeerFactory for NativePeerFactory {
    async fn create(&self, config: &PeerConfig) -> Result<Box<dyn PeerConnection>> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|url| RTCIceServer {
                    urls: vec![url.clone()],
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };
        let inner = Arc::new(api.new_peer_connection(rtc_config).await?);
        let (events_tx, events) = mpsc::unbounded_channel();

        let states = events_tx.clone();
        inner.on_peer_connection_state_change(Box::new(move |state| {
            let state = ConnectionState::from(state);
            tracing::debug!(%state, "Peer connection state changed");
            let _ = states.send(PeerEvent::StateChanged(state));
            Box::pin(async {})
        }));

        let tracks = events_tx.clone();
        let remote_audio = self.remote_audio.clone();
        inner.on_track(Box::new(move |track, _receiver, _transceiver| {
            let _ = tracks.send(PeerEvent::RemoteTrack { track_id: track.id() });
            if let (RTPCodecType::Audio, Some(sink)) = (track.kind(), remote_audio.clone()) {
                tokio::spawn(async move {
                    while let Ok((packet, _)) = track.read_rtp().await {
                        if sink.send(packet.payload).is_err() {
                            break;
                        }
                    }
                });
            }
            Box::pin(async {})
        }));

        Ok(Box::new(NativePeer {
            inner,
            senders: Vec::new(),
            events_tx,
            events,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct ForeignTrack;

    impl AudioTrack for ForeignTrack {
        fn id(&self) -> &str {
            "foreign"
        }

        fn stop(&self) {}

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn peer_states_map_onto_connection_states() {
        assert_eq!(ConnectionState::from(RTCPeerConnectionState::Connected), ConnectionState::Connected);
        assert_eq!(ConnectionState::from(RTCPeerConnectionState::Disconnected), ConnectionState::Disconnected);
        assert_eq!(ConnectionState::from(RTCPeerConnectionState::Failed), ConnectionState::Failed);
        assert_eq!(ConnectionState::from(RTCPeerConnectionState::Unspecified), ConnectionState::New);
    }

    #[tokio::test]
    async fn microphone_tracks_reach_the_capture_loop() {
        let (media, mut captures) = NativeMedia::with_capture();
        let track = media.microphone(AudioConstraints::default()).await.unwrap();
        let captured = captures.recv().await.unwrap();
        assert_eq!(captured.id(), track.id());

        track.stop();
        assert!(captured.is_stopped());
        let err = captured.write_opus(Bytes::from_static(&OPUS_SILENCE), OPUS_FRAME).await;
        assert!(matches!(err, Err(Error::ConnectionClosed)));

        drop(captures);
        let err = media.microphone(AudioConstraints::default()).await.unwrap_err();
        assert!(matches!(err, Error::MediaAccess(_)));
    }

    #[tokio::test]
    async fn offer_carries_audio_and_data_channel() {
        let (media, _captures) = NativeMedia::with_capture();
        let mut peer = NativePeerFactory::new().create(&PeerConfig { ice_servers: Vec::new() }).await.unwrap();

        let microphone = media.microphone(AudioConstraints::default()).await.unwrap();
        assert_eq!(peer.add_track(microphone).await.unwrap(), TrackSender(0));
        let channel = peer.create_data_channel("oai-events".to_string()).await.unwrap();
        assert_eq!(channel.label(), "oai-events");
        assert!(!channel.is_open());

        let offer = peer.create_offer().await.unwrap();
        assert!(offer.contains("m=audio"));
        assert!(offer.contains("m=application"));
        assert!(offer.to_lowercase().contains("opus"));

        let silence = media.silent_track();
        peer.replace_track(TrackSender(0), Arc::clone(&silence)).await.unwrap();
        silence.stop();
        peer.close().await;
    }

    #[tokio::test]
    async fn foreign_tracks_are_rejected() {
        let mut peer = NativePeerFactory::new().create(&PeerConfig { ice_servers: Vec::new() }).await.unwrap();
        let err = peer.add_track(Arc::new(ForeignTrack)).await.unwrap_err();
        assert!(matches!(err, Error::MediaAccess(_)));
    }
}
