#[cfg(feature = "webrtc")]
pub mod native;
pub mod peer;
pub mod rest;

pub use peer::{
    AudioConstraints, AudioTrack, ConnectionState, DataChannel, MediaDevices, PeerConfig,
    PeerConnection, PeerEvent, PeerFactory, TrackSender,
};
pub use rest::{HttpSignaling, RealtimeRestAdapter, Signaling};
#[cfg(feature = "webrtc")]
pub use native::{NativeChannel, NativeMedia, NativePeer, NativePeerFactory, NativeTrack};
