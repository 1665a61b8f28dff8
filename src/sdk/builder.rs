use crate::knowledge::KnowledgeSource;
use crate::protocol::models::{SessionConfig, DEFAULT_VOICE};
use crate::transport::peer::{AudioConstraints, MediaDevices, PeerConfig, PeerFactory};
use crate::transport::rest::{HttpSignaling, Signaling, DEFAULT_REALTIME_URL};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

use super::connection::Backends;
use super::dispatcher::Dispatcher;
use super::reconnect::ReconnectPolicy;
use super::session::{Session, SessionSettings, DEFAULT_FOLLOW_UP_DELAY, DEFAULT_LOG_CAPACITY};
use super::tools::{ToolRegistry, DEFAULT_INSTRUCTIONS};

pub const DEFAULT_SESSION_URL: &str = "http://localhost:3000/api/session";

pub struct Realtime;

impl Realtime {
    #[must_use]
    pub fn builder() -> RealtimeBuilder {
        RealtimeBuilder::new()
    }
}

pub struct RealtimeBuilder {
    session_url: String,
    realtime_url: String,
    model: String,
    voice: String,
    instructions: String,
    tools: Option<ToolRegistry>,
    signaling: Option<Arc<dyn Signaling>>,
    peers: Option<Arc<dyn PeerFactory>>,
    media: Option<Arc<dyn MediaDevices>>,
    knowledge: Option<Arc<dyn KnowledgeSource>>,
    peer_config: PeerConfig,
    audio: AudioConstraints,
    reconnect: ReconnectPolicy,
    follow_up_delay: Duration,
    log_capacity: usize,
}

impl RealtimeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_url: DEFAULT_SESSION_URL.to_string(),
            realtime_url: DEFAULT_REALTIME_URL.to_string(),
            model: crate::protocol::models::DEFAULT_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            tools: None,
            signaling: None,
            peers: None,
            media: None,
            knowledge: None,
            peer_config: PeerConfig::default(),
            audio: AudioConstraints::default(),
            reconnect: ReconnectPolicy::default(),
            follow_up_delay: DEFAULT_FOLLOW_UP_DELAY,
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }

    /// Backend endpoint that mints ephemeral session credentials.
    #[must_use]
    pub fn session_url(mut self, url: impl Into<String>) -> Self {
        self.session_url = url.into();
        self
    }

    /// Realtime endpoint receiving the SDP offer.
    #[must_use]
    pub fn realtime_url(mut self, url: impl Into<String>) -> Self {
        self.realtime_url = url.into();
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    #[must_use]
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Replace the default whiteboard tool set.
    #[must_use]
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Use a custom signaling backend instead of HTTP.
    #[must_use]
    pub fn signaling(mut self, signaling: Arc<dyn Signaling>) -> Self {
        self.signaling = Some(signaling);
        self
    }

    #[must_use]
    pub fn peers(mut self, peers: Arc<dyn PeerFactory>) -> Self {
        self.peers = Some(peers);
        self
    }

    #[must_use]
    pub fn media(mut self, media: Arc<dyn MediaDevices>) -> Self {
        self.media = Some(media);
        self
    }

    #[must_use]
    pub fn knowledge(mut self, knowledge: Arc<dyn KnowledgeSource>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    #[must_use]
    pub fn peer_config(mut self, config: PeerConfig) -> Self {
        self.peer_config = config;
        self
    }

    #[must_use]
    pub const fn audio(mut self, audio: AudioConstraints) -> Self {
        self.audio = audio;
        self
    }

    #[must_use]
    pub const fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Delay between acknowledging a tool call and requesting the next response.
    #[must_use]
    pub const fn follow_up_delay(mut self, delay: Duration) -> Self {
        self.follow_up_delay = delay;
        self
    }

    #[must_use]
    pub const fn log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    /// Spawn the session actor without connecting. Must run inside a Tokio runtime.
    ///
    /// # Errors
    /// `InvalidConfig` when no media devices are set, when no peer factory is set
    /// and the `webrtc` feature is off, or when the
    /// signaling URLs are invalid.
    #[allow(clippy::result_large_err)]
    pub fn build(self) -> Result<Session> {
        let peers = match self.peers {
            Some(peers) => peers,
            None => default_peers()?,
        };
        let media = self
            .media
            .ok_or_else(|| Error::InvalidConfig("media devices required".to_string()))?;

        let signaling: Arc<dyn Signaling> = match self.signaling {
            Some(signaling) => signaling,
            None => Arc::new(
                HttpSignaling::new(&self.session_url, &self.realtime_url, self.model.clone())
                    .map_err(|e| Error::InvalidConfig(e.to_string()))?,
            ),
        };

        let tools = self.tools.unwrap_or_else(ToolRegistry::whiteboard).try_as_tools()?;
        let session_update = SessionConfig::for_update(self.voice, self.instructions, tools);

        tracing::debug!(model = %self.model, "Building realtime session");
        Ok(Session::spawn(SessionSettings {
            backends: Backends {
                signaling,
                peers,
                media,
                peer_config: self.peer_config,
                audio: self.audio,
            },
            dispatcher: Dispatcher::new(self.knowledge),
            session_update,
            reconnect: self.reconnect,
            follow_up_delay: self.follow_up_delay,
            log_capacity: self.log_capacity,
        }))
    }

    /// Build the session and start it.
    ///
    /// # Errors
    /// Configuration errors from [`Self::build`], or the first connect failure.
    pub async fn connect(self) -> Result<Session> {
        let session = self.build()?;
        session.connect().await?;
        Ok(session)
    }
}

#[cfg(feature = "webrtc")]
#[allow(clippy::unnecessary_wraps)]
fn default_peers() -> Result<Arc<dyn PeerFactory>> {
    Ok(Arc::new(crate::transport::native::NativePeerFactory::new()))
}

#[cfg(not(feature = "webrtc"))]
fn default_peers() -> Result<Arc<dyn PeerFactory>> {
    Err(Error::InvalidConfig("peer factory required".to_string()))
}

impl Default for RealtimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
