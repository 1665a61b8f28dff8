#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! Voice-driven teaching assistant over the `OpenAI` Realtime API.
//!
//! - [`sdk`] supervises a WebRTC session: credentials, negotiation, reconnection and
//!   the tool calls that drive the whiteboard.
//! - [`whiteboard`] holds the slide history and its highlight-aware render model.
//! - [`knowledge`] proxies the local retrieval service.
//! - [`server`] exposes the HTTP backend the browser talks to.

pub mod config;
pub mod error;
pub mod knowledge;
pub mod protocol;
pub mod sdk;
pub mod server;
pub mod transport;
pub mod whiteboard;

pub use error::{Error, Result, ServerError};
pub use knowledge::{KnowledgeClient, KnowledgeResponse, KnowledgeResult, KnowledgeSource};
pub use protocol::client_events::ClientEvent;
pub use protocol::models::{Item, Response, SessionConfig, SessionToken, Tool};
pub use protocol::server_events::ServerEvent;
pub use sdk::{
    Navigation, Realtime, RealtimeBuilder, ReconnectPolicy, Session, SessionEvent, SessionHandle,
    SessionStatus, ToolCall, ToolCommand, ToolRegistry,
};
pub use transport::peer::{ConnectionState, PeerEvent};
pub use whiteboard::{Command, RenderedSlide, Slide, Whiteboard};

/// Upper bound for payloads echoed into trace logs.
pub const TRACE_LOG_MAX_BYTES: usize = 1024;
const TRACE_TRUNCATE_SUFFIX: &str = "... (truncated)";

/// Cut `s` to at most `max_bytes` on a char boundary, noting how much was dropped.
#[must_use]
pub fn safe_truncate(s: &str, max_bytes: usize) -> std::borrow::Cow<'_, str> {
    if s.len() <= max_bytes {
        return std::borrow::Cow::Borrowed(s);
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    std::borrow::Cow::Owned(format!("{} {} {} bytes", &s[..end], TRACE_TRUNCATE_SUFFIX, s.len() - end))
}
