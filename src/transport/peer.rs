//! Seams over the WebRTC stack.
//!
//! The crate never speaks RTP or ICE itself. A browser binding or a native WebRTC
//! stack implements these traits and is handed to the session builder. With the
//! `webrtc` feature, [`super::native`] provides one over webrtc-rs.

use async_trait::async_trait;
use crate::Result;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

pub use futures::future::BoxFuture;

pub const DATA_CHANNEL_LABEL: &str = "oai-events";

pub const DEFAULT_ICE_SERVERS: [&str; 2] = [
    "stun:stun.l.google.com:19302",
    "stun:stun1.l.google.com:19302",
];

/// Peer connection status as reported by the WebRTC stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl ConnectionState {
    /// States that should trigger an automatic reconnect.
    #[must_use]
    pub const fn is_lost(self) -> bool {
        matches!(self, Self::Disconnected | Self::Failed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "new",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Failed => "failed",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConfig {
    pub ice_servers: Vec<String>,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            ice_servers: DEFAULT_ICE_SERVERS.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Capture constraints for the microphone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

/// Events surfaced by a peer connection and its data channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    StateChanged(ConnectionState),
    ChannelOpen,
    ChannelMessage(String),
    ChannelClosed,
    ChannelError(String),
    RemoteTrack { track_id: String },
}

/// Opaque handle to an outgoing audio sender on a peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackSender(pub usize);

pub trait AudioTrack: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;
    fn stop(&self);

    /// Lets a stack recover the concrete tracks it handed out.
    fn as_any(&self) -> &dyn Any;
}

pub trait DataChannel: Send + Sync {
    fn label(&self) -> &str;
    fn is_open(&self) -> bool;

    /// # Errors
    /// Returns an error if the underlying channel refuses the message.
    #[allow(clippy::result_large_err)]
    fn send_text(&self, text: String) -> Result<()>;

    fn close(&self);
}

pub trait PeerConnection: Send {
    fn add_track(&mut self, track: Arc<dyn AudioTrack>) -> BoxFuture<'_, Result<TrackSender>>;
    fn replace_track(&mut self, sender: TrackSender, track: Arc<dyn AudioTrack>) -> BoxFuture<'_, Result<()>>;
    fn create_data_channel(&mut self, label: String) -> BoxFuture<'_, Result<Arc<dyn DataChannel>>>;
    fn create_offer(&mut self) -> BoxFuture<'_, Result<String>>;
    fn set_local_description(&mut self, sdp: String) -> BoxFuture<'_, Result<()>>;
    fn set_remote_description(&mut self, sdp: String) -> BoxFuture<'_, Result<()>>;

    /// Next state change or channel event; `None` once the connection is gone.
    fn next_event(&mut self) -> BoxFuture<'_, Option<PeerEvent>>;
    fn close(&mut self) -> BoxFuture<'_, ()>;
}

#[async_trait]
pub trait PeerFactory: Send + Sync {
    /// # Errors
    /// Returns an error if the stack cannot allocate a peer connection.
    async fn create(&self, config: &PeerConfig) -> Result<Box<dyn PeerConnection>>;
}

#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Acquire a live microphone track.
    async fn microphone(&self, constraints: AudioConstraints) -> Result<Arc<dyn AudioTrack>>;

    /// A track that sends silence, used while muted.
    fn silent_track(&self) -> Arc<dyn AudioTrack>;
}
