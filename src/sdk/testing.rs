//! In-process stand-ins for the WebRTC stack and signaling.

use crate::protocol::models::{ClientSecret, SessionToken};
use crate::transport::peer::{
    AudioConstraints, AudioTrack, BoxFuture, DataChannel, MediaDevices, PeerConfig, PeerConnection,
    PeerEvent, PeerFactory, TrackSender,
};
use crate::transport::rest::Signaling;
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use super::connection::Backends;

#[derive(Debug, Default)]
pub struct MockChannel {
    open: AtomicBool,
    sent: Mutex<Vec<String>>,
}

impl MockChannel {
    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|raw| serde_json::from_str(raw).unwrap())
            .collect()
    }

    pub fn sent_types(&self) -> Vec<String> {
        self.sent()
            .iter()
            .map(|event| event["type"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

impl DataChannel for MockChannel {
    fn label(&self) -> &str {
        crate::transport::peer::DATA_CHANNEL_LABEL
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn send_text(&self, text: String) -> Result<()> {
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

/// Test-side view of a peer created by [`MockPeerFactory`].
#[derive(Clone)]
pub struct PeerControl {
    pub events: mpsc::UnboundedSender<PeerEvent>,
    pub channel: Arc<MockChannel>,
    pub replaced: Arc<Mutex<Vec<String>>>,
    pub closed: Arc<AtomicBool>,
}

impl PeerControl {
    pub fn emit(&self, event: PeerEvent) {
        self.events.send(event).unwrap();
    }

    /// Open the data channel and report it to the session.
    pub fn open_channel(&self) {
        self.channel.open();
        self.emit(PeerEvent::ChannelOpen);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct MockPeer {
    events: mpsc::UnboundedReceiver<PeerEvent>,
    channel: Arc<MockChannel>,
    replaced: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
    reject_answer: bool,
}

impl PeerConnection for MockPeer {
    fn add_track(&mut self, _track: Arc<dyn AudioTrack>) -> BoxFuture<'_, Result<TrackSender>> {
        Box::pin(async { Ok(TrackSender(0)) })
    }

    fn replace_track(&mut self, _sender: TrackSender, track: Arc<dyn AudioTrack>) -> BoxFuture<'_, Result<()>> {
        let replaced = Arc::clone(&self.replaced);
        Box::pin(async move {
            replaced.lock().unwrap().push(track.id().to_string());
            Ok(())
        })
    }

    fn create_data_channel(&mut self, _label: String) -> BoxFuture<'_, Result<Arc<dyn DataChannel>>> {
        let channel: Arc<dyn DataChannel> = self.channel.clone();
        Box::pin(async move { Ok(channel) })
    }

    fn create_offer(&mut self) -> BoxFuture<'_, Result<String>> {
        Box::pin(async { Ok("v=0 offer".to_string()) })
    }

    fn set_local_description(&mut self, _sdp: String) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn set_remote_description(&mut self, _sdp: String) -> BoxFuture<'_, Result<()>> {
        let reject = self.reject_answer;
        Box::pin(async move {
            if reject {
                Err(Error::Negotiation("answer rejected".to_string()))
            } else {
                Ok(())
            }
        })
    }

    fn next_event(&mut self) -> BoxFuture<'_, Option<PeerEvent>> {
        Box::pin(async move { self.events.recv().await })
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        self.channel.close();
        self.closed.store(true, Ordering::SeqCst);
        Box::pin(async {})
    }
}

#[derive(Default)]
pub struct MockPeerFactory {
    peers: Mutex<Vec<PeerControl>>,
    pub reject_answer: AtomicBool,
}

impl MockPeerFactory {
    pub fn created(&self) -> usize {
        self.peers.lock().unwrap().len()
    }

    pub fn peer(&self, index: usize) -> PeerControl {
        self.peers.lock().unwrap()[index].clone()
    }

    pub fn last(&self) -> PeerControl {
        self.peers.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl PeerFactory for MockPeerFactory {
    async fn create(&self, _config: &PeerConfig) -> Result<Box<dyn PeerConnection>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let control = PeerControl {
            events: tx,
            channel: Arc::new(MockChannel::default()),
            replaced: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
        };
        let peer = MockPeer {
            events: rx,
            channel: Arc::clone(&control.channel),
            replaced: Arc::clone(&control.replaced),
            closed: Arc::clone(&control.closed),
            reject_answer: self.reject_answer.load(Ordering::SeqCst),
        };
        self.peers.lock().unwrap().push(control);
        Ok(Box::new(peer))
    }
}

#[derive(Debug, Default)]
pub struct MockSignaling {
    pub fail: AtomicBool,
    pub token_calls: AtomicUsize,
}

impl MockSignaling {
    pub fn calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Signaling for MockSignaling {
    async fn session_token(&self) -> Result<SessionToken> {
        let call = self.token_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::SessionToken("Session API failed: 500".to_string()));
        }
        Ok(SessionToken {
            id: Some(format!("sess_{call}")),
            client_secret: Some(ClientSecret { value: format!("ek_{call}"), expires_at: None }),
        })
    }

    async fn exchange_sdp(&self, _token: &str, _offer_sdp: String) -> Result<String> {
        Ok("v=0 answer".to_string())
    }
}

#[derive(Debug)]
pub struct MockTrack {
    id: String,
    stopped: AtomicBool,
}

impl MockTrack {
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl AudioTrack for MockTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct MockMedia {
    pub deny: AtomicBool,
    tracks: Mutex<Vec<Arc<MockTrack>>>,
}

impl MockMedia {
    pub fn tracks(&self) -> Vec<Arc<MockTrack>> {
        self.tracks.lock().unwrap().clone()
    }

    fn track(&self, prefix: &str) -> Arc<MockTrack> {
        let mut tracks = self.tracks.lock().unwrap();
        let track = Arc::new(MockTrack {
            id: format!("{prefix}-{}", tracks.len()),
            stopped: AtomicBool::new(false),
        });
        tracks.push(Arc::clone(&track));
        track
    }
}

#[async_trait]
impl MediaDevices for MockMedia {
    async fn microphone(&self, _constraints: AudioConstraints) -> Result<Arc<dyn AudioTrack>> {
        if self.deny.load(Ordering::SeqCst) {
            return Err(Error::MediaAccess("Permission denied".to_string()));
        }
        Ok(self.track("mic"))
    }

    fn silent_track(&self) -> Arc<dyn AudioTrack> {
        self.track("silence")
    }
}

pub struct Rig {
    pub signaling: Arc<MockSignaling>,
    pub peers: Arc<MockPeerFactory>,
    pub media: Arc<MockMedia>,
}

impl Rig {
    pub fn new() -> Self {
        Self {
            signaling: Arc::new(MockSignaling::default()),
            peers: Arc::new(MockPeerFactory::default()),
            media: Arc::new(MockMedia::default()),
        }
    }

    pub fn backends(&self) -> Backends {
        Backends {
            signaling: self.signaling.clone(),
            peers: self.peers.clone(),
            media: self.media.clone(),
            peer_config: PeerConfig::default(),
            audio: AudioConstraints::default(),
        }
    }
}
