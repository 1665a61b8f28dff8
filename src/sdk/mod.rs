//! Session supervision over a WebRTC peer.
//!
//! A [`Session`] owns the transport, the reconnect timer and the whiteboard inside a
//! single task. Callers drive it through [`SessionHandle`] and observe it through
//! [`SessionEvent`]s; the low-level protocol types stay reachable under `crate::protocol`.

mod builder;
mod connection;
mod dispatcher;
mod reconnect;
mod session;
#[cfg(test)]
mod testing;
mod tools;

pub use builder::{Realtime, RealtimeBuilder, DEFAULT_SESSION_URL};
pub use connection::{Backends, RealtimeTransport};
pub use dispatcher::{Dispatcher, ToolOutcome};
pub use reconnect::{
    ReconnectDecision, ReconnectPolicy, ReconnectTracker, DEFAULT_MAX_RECONNECT_ATTEMPTS,
    DEFAULT_RECONNECT_BASE_DELAY, DEFAULT_RECONNECT_STEP,
};
pub use session::{
    Navigation, Session, SessionEvent, SessionHandle, SessionStatus, DEFAULT_FOLLOW_UP_DELAY,
    DEFAULT_LOG_CAPACITY,
};
pub use tools::{SearchKnowledge, ToolCall, ToolCommand, ToolDefinition, ToolRegistry, DEFAULT_INSTRUCTIONS};
