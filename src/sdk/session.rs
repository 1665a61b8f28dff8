use crate::error::ServerError;
use crate::protocol::client_events::ClientEvent;
use crate::protocol::models::{Item, Response, SessionConfig};
use crate::protocol::server_events::ServerEvent;
use crate::transport::peer::{ConnectionState, PeerEvent};
use crate::whiteboard::{RenderedSlide, Whiteboard};
use crate::{Error, Result};

use super::connection::{Backends, RealtimeTransport};
use super::dispatcher::Dispatcher;
use super::reconnect::{ReconnectDecision, ReconnectPolicy, ReconnectTracker};
use super::tools::ToolCall;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

pub const DEFAULT_FOLLOW_UP_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_LOG_CAPACITY: usize = 100;
const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 128;

/// Notifications published by a running session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged(ConnectionState),
    Reconnecting { attempt: u32, delay: Duration },
    ReconnectExhausted,
    ChannelOpened,
    ChannelClosed,
    /// First output item of a completed response.
    Output(Item),
    ToolCall(ToolCall),
    BoardUpdated(Whiteboard),
    ServerError(ServerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub state: ConnectionState,
    pub started: bool,
    pub listening: bool,
    pub reconnecting: bool,
    pub reconnect_attempts: u32,
    pub microphone: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Previous,
    Next,
    Select(usize),
}

pub(crate) struct SessionSettings {
    pub backends: Backends,
    pub dispatcher: Dispatcher,
    pub session_update: SessionConfig,
    pub reconnect: ReconnectPolicy,
    pub follow_up_delay: Duration,
    pub log_capacity: usize,
}

enum Command {
    Connect { respond: oneshot::Sender<Result<()>> },
    Disconnect { respond: oneshot::Sender<()> },
    Send { event: ClientEvent, respond: oneshot::Sender<Result<()>> },
    SetMicrophone { enabled: bool, respond: oneshot::Sender<Result<()>> },
    Interrupt { respond: oneshot::Sender<Result<()>> },
    Navigate { navigation: Navigation, respond: oneshot::Sender<Option<usize>> },
    Whiteboard { respond: oneshot::Sender<Whiteboard> },
    Render { respond: oneshot::Sender<Option<RenderedSlide>> },
    Status { respond: oneshot::Sender<SessionStatus> },
    Logs { respond: oneshot::Sender<Vec<Item>> },
}

/// Cloneable handle to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<Command>,
}

/// A realtime session: the handle plus the event stream.
///
/// Dropping the session and every handle disconnects it.
pub struct Session {
    handle: SessionHandle,
    event_rx: mpsc::Receiver<SessionEvent>,
}

impl SessionHandle {
    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| Error::ConnectionClosed)?;
        rx.await.map_err(|_| Error::ConnectionClosed)
    }

    /// Start the session. A no-op while a session is already started.
    ///
    /// # Errors
    /// `SessionToken`, `MediaAccess` or `Negotiation` if the connect attempt fails.
    pub async fn connect(&self) -> Result<()> {
        self.request(|respond| Command::Connect { respond }).await?
    }

    /// Stop the session and release every resource. Idempotent.
    ///
    /// # Errors
    /// Returns an error if the session task is gone.
    pub async fn disconnect(&self) -> Result<()> {
        self.request(|respond| Command::Disconnect { respond }).await
    }

    /// Send a raw client event over the data channel.
    ///
    /// # Errors
    /// `ChannelUnavailable` when no data channel is open.
    pub async fn send_event(&self, event: ClientEvent) -> Result<()> {
        self.request(|respond| Command::Send { event, respond }).await?
    }

    /// Mute or unmute the microphone without renegotiating.
    ///
    /// # Errors
    /// `ConnectionClosed` without a transport, `MediaAccess` if the microphone is refused.
    pub async fn set_microphone(&self, enabled: bool) -> Result<()> {
        self.request(|respond| Command::SetMicrophone { enabled, respond }).await?
    }

    /// Cancel the active response and drop any queued output audio.
    ///
    /// # Errors
    /// `ChannelUnavailable` when no data channel is open.
    pub async fn interrupt(&self) -> Result<()> {
        self.request(|respond| Command::Interrupt { respond }).await?
    }

    /// # Errors
    /// Returns an error if the session task is gone.
    pub async fn navigate(&self, navigation: Navigation) -> Result<Option<usize>> {
        self.request(|respond| Command::Navigate { navigation, respond }).await
    }

    /// # Errors
    /// Returns an error if the session task is gone.
    pub async fn previous_slide(&self) -> Result<Option<usize>> {
        self.navigate(Navigation::Previous).await
    }

    /// # Errors
    /// Returns an error if the session task is gone.
    pub async fn next_slide(&self) -> Result<Option<usize>> {
        self.navigate(Navigation::Next).await
    }

    /// # Errors
    /// Returns an error if the session task is gone.
    pub async fn select_slide(&self, index: usize) -> Result<Option<usize>> {
        self.navigate(Navigation::Select(index)).await
    }

    /// Snapshot of the whiteboard.
    ///
    /// # Errors
    /// Returns an error if the session task is gone.
    pub async fn whiteboard(&self) -> Result<Whiteboard> {
        self.request(|respond| Command::Whiteboard { respond }).await
    }

    /// Render model of the current slide.
    ///
    /// # Errors
    /// Returns an error if the session task is gone.
    pub async fn render_current(&self) -> Result<Option<RenderedSlide>> {
        self.request(|respond| Command::Render { respond }).await
    }

    /// # Errors
    /// Returns an error if the session task is gone.
    pub async fn status(&self) -> Result<SessionStatus> {
        self.request(|respond| Command::Status { respond }).await
    }

    /// Recent response outputs, newest first.
    ///
    /// # Errors
    /// Returns an error if the session task is gone.
    pub async fn logs(&self) -> Result<Vec<Item>> {
        self.request(|respond| Command::Logs { respond }).await
    }
}

impl Session {
    pub(crate) fn spawn(settings: SessionSettings) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>(COMMAND_BUFFER);
        let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(EVENT_BUFFER);

        let actor = SessionActor {
            backends: settings.backends,
            dispatcher: settings.dispatcher,
            session_update: settings.session_update,
            follow_up_delay: settings.follow_up_delay,
            log_capacity: settings.log_capacity,
            tracker: ReconnectTracker::new(settings.reconnect),
            transport: None,
            state: ConnectionState::New,
            started: false,
            listening: false,
            reconnect_at: None,
            follow_up_at: None,
            board: Whiteboard::new(),
            log: VecDeque::new(),
            events: event_tx,
        };
        tokio::spawn(actor.run(cmd_rx));

        Self {
            handle: SessionHandle { sender: cmd_tx },
            event_rx,
        }
    }

    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Await the next session event.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.event_rx.recv().await
    }

    /// # Errors
    /// See [`SessionHandle::connect`].
    pub async fn connect(&self) -> Result<()> {
        self.handle.connect().await
    }

    /// # Errors
    /// See [`SessionHandle::disconnect`].
    pub async fn disconnect(&self) -> Result<()> {
        self.handle.disconnect().await
    }

    /// # Errors
    /// See [`SessionHandle::send_event`].
    pub async fn send_event(&self, event: ClientEvent) -> Result<()> {
        self.handle.send_event(event).await
    }

    /// # Errors
    /// See [`SessionHandle::set_microphone`].
    pub async fn set_microphone(&self, enabled: bool) -> Result<()> {
        self.handle.set_microphone(enabled).await
    }

    /// # Errors
    /// See [`SessionHandle::interrupt`].
    pub async fn interrupt(&self) -> Result<()> {
        self.handle.interrupt().await
    }

    /// # Errors
    /// See [`SessionHandle::whiteboard`].
    pub async fn whiteboard(&self) -> Result<Whiteboard> {
        self.handle.whiteboard().await
    }

    /// # Errors
    /// See [`SessionHandle::status`].
    pub async fn status(&self) -> Result<SessionStatus> {
        self.handle.status().await
    }
}

struct SessionActor {
    backends: Backends,
    dispatcher: Dispatcher,
    session_update: SessionConfig,
    follow_up_delay: Duration,
    log_capacity: usize,
    tracker: ReconnectTracker,
    transport: Option<RealtimeTransport>,
    state: ConnectionState,
    started: bool,
    listening: bool,
    reconnect_at: Option<Instant>,
    follow_up_at: Option<Instant>,
    board: Whiteboard,
    log: VecDeque<Item>,
    events: mpsc::Sender<SessionEvent>,
}

impl SessionActor {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => break,
                    }
                }
                event = next_peer_event(self.transport.as_mut()) => {
                    self.handle_peer_event(event).await;
                }
                () = wait_until(self.reconnect_at) => {
                    self.reconnect_at = None;
                    self.reconnect().await;
                }
                () = wait_until(self.follow_up_at) => {
                    self.follow_up_at = None;
                    if let Err(err) = self.send(ClientEvent::response_create()) {
                        tracing::warn!("Failed to request follow-up response: {err}");
                    }
                }
            }
        }

        tracing::debug!("Session dropped; tearing down");
        self.disconnect().await;
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect { respond } => {
                let result = self.connect().await;
                let _ = respond.send(result);
            }
            Command::Disconnect { respond } => {
                self.disconnect().await;
                let _ = respond.send(());
            }
            Command::Send { event, respond } => {
                let _ = respond.send(self.send(event));
            }
            Command::SetMicrophone { enabled, respond } => {
                let result = match self.transport.as_mut() {
                    Some(transport) => {
                        transport
                            .set_microphone(enabled, self.backends.media.as_ref(), self.backends.audio)
                            .await
                    }
                    None => Err(Error::ConnectionClosed),
                };
                let _ = respond.send(result);
            }
            Command::Interrupt { respond } => {
                let result = self
                    .send(ClientEvent::ResponseCancel { event_id: None, response_id: None })
                    .and_then(|()| self.send(ClientEvent::OutputAudioBufferClear { event_id: None }));
                let _ = respond.send(result);
            }
            Command::Navigate { navigation, respond } => {
                let before = self.board.current_index();
                match navigation {
                    Navigation::Previous => {
                        self.board.previous();
                    }
                    Navigation::Next => {
                        self.board.next();
                    }
                    Navigation::Select(index) => {
                        self.board.select(index);
                    }
                }
                let after = self.board.current_index();
                if before != after {
                    self.emit(SessionEvent::BoardUpdated(self.board.clone()));
                }
                let _ = respond.send(after);
            }
            Command::Whiteboard { respond } => {
                let _ = respond.send(self.board.clone());
            }
            Command::Render { respond } => {
                let _ = respond.send(self.board.render_current());
            }
            Command::Status { respond } => {
                let _ = respond.send(self.status());
            }
            Command::Logs { respond } => {
                let _ = respond.send(self.log.iter().cloned().collect());
            }
        }
    }

    fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            started: self.started,
            listening: self.listening,
            reconnecting: self.tracker.is_reconnecting(),
            reconnect_attempts: self.tracker.attempts(),
            microphone: self
                .transport
                .as_ref()
                .is_some_and(RealtimeTransport::is_microphone_live),
        }
    }

    async fn connect(&mut self) -> Result<()> {
        if self.started {
            tracing::debug!("Session already started");
            return Ok(());
        }
        // a manual connect gets the full reconnect budget back
        self.tracker.reset();
        self.start().await
    }

    async fn start(&mut self) -> Result<()> {
        if let Some(previous) = self.transport.take() {
            previous.close().await;
        }
        self.started = true;
        self.listening = false;
        self.set_state(ConnectionState::Connecting).await;

        match RealtimeTransport::connect(&self.backends).await {
            Ok(transport) => {
                tracing::info!(session_id = ?transport.session_id(), "Session started");
                self.transport = Some(transport);
                self.tracker.on_connected();
                self.reconnect_at = None;
                Ok(())
            }
            Err(err) => {
                tracing::error!("Failed to start session: {err}");
                self.started = false;
                self.set_state(ConnectionState::Failed).await;
                Err(err)
            }
        }
    }

    async fn reconnect(&mut self) {
        tracing::info!(
            attempt = self.tracker.attempts(),
            max = self.tracker.policy().max_attempts,
            "Attempting to reconnect"
        );
        self.started = false;
        if let Err(err) = self.start().await {
            tracing::warn!("Reconnect attempt failed: {err}");
            let decision = self.tracker.on_attempt_failed();
            self.apply_decision(decision).await;
        }
    }

    async fn disconnect(&mut self) {
        self.reconnect_at = None;
        self.follow_up_at = None;
        self.tracker.reset();
        self.started = false;
        self.listening = false;
        if let Some(transport) = self.transport.take() {
            transport.close().await;
            tracing::info!("Session stopped");
        }
        self.set_state(ConnectionState::Closed).await;
    }

    async fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        tracing::info!(from = %self.state, to = %state, "Connection state changed");
        self.state = state;
        self.emit(SessionEvent::StateChanged(state));

        if state == ConnectionState::Connected {
            self.tracker.on_connected();
            self.reconnect_at = None;
        } else if state.is_lost() {
            let decision = self.tracker.on_connection_lost();
            self.apply_decision(decision).await;
        }
    }

    async fn apply_decision(&mut self, decision: ReconnectDecision) {
        match decision {
            ReconnectDecision::Schedule { attempt, delay } => {
                tracing::info!(
                    attempt,
                    max = self.tracker.policy().max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Scheduling reconnect"
                );
                self.reconnect_at = Some(Instant::now() + delay);
                self.emit(SessionEvent::Reconnecting { attempt, delay });
            }
            ReconnectDecision::Exhausted => {
                tracing::warn!("Reconnect attempts exhausted; waiting for a manual connect");
                self.reconnect_at = None;
                self.started = false;
                self.listening = false;
                if let Some(transport) = self.transport.take() {
                    transport.close().await;
                }
                self.emit(SessionEvent::ReconnectExhausted);
            }
            ReconnectDecision::Ignore => {}
        }
    }

    #[allow(clippy::result_large_err)]
    fn send(&self, event: ClientEvent) -> Result<()> {
        match &self.transport {
            Some(transport) => transport.send(event),
            None => {
                tracing::warn!(kind = event.kind(), "No transport; dropping event");
                Err(Error::ChannelUnavailable)
            }
        }
    }

    async fn handle_peer_event(&mut self, event: PeerEvent) {
        match event {
            PeerEvent::StateChanged(state) => self.set_state(state).await,
            PeerEvent::ChannelOpen => {
                tracing::info!("Data channel opened");
                self.listening = true;
                self.log.clear();
                let update = ClientEvent::session_update(self.session_update.clone());
                if let Err(err) = self.send(update) {
                    tracing::warn!("Failed to send session update: {err}");
                }
                self.emit(SessionEvent::ChannelOpened);
            }
            PeerEvent::ChannelMessage(text) => self.handle_message(&text).await,
            PeerEvent::ChannelClosed => {
                tracing::info!("Data channel closed");
                self.listening = false;
                self.emit(SessionEvent::ChannelClosed);
            }
            PeerEvent::ChannelError(message) => {
                tracing::error!("Data channel error: {message}");
            }
            PeerEvent::RemoteTrack { track_id } => {
                tracing::info!(%track_id, "Remote audio track received");
            }
        }
    }

    async fn handle_message(&mut self, text: &str) {
        tracing::trace!("Received event: {}", crate::safe_truncate(text, crate::TRACE_LOG_MAX_BYTES));
        let event: ServerEvent = match serde_json::from_str(text) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!("Dropping malformed server event: {err}");
                return;
            }
        };

        match event {
            ServerEvent::ResponseDone { response, .. } => self.handle_response_done(response).await,
            ServerEvent::Error { error, .. } => {
                tracing::warn!(code = ?error.code, message = %error.message, "Realtime API error");
                self.emit(SessionEvent::ServerError(error));
            }
            ServerEvent::SessionCreated { .. } | ServerEvent::SessionUpdated { .. } => {
                tracing::debug!("Session configuration acknowledged");
            }
            other => {
                tracing::trace!(kind = other.kind(), "Unhandled server event");
            }
        }
    }

    async fn handle_response_done(&mut self, response: Response) {
        if let Some(item) = response.first_output() {
            self.log.push_front(item.clone());
            self.log.truncate(self.log_capacity);
            self.emit(SessionEvent::Output(item.clone()));
        }

        let Some(outcome) = self.dispatcher.handle_response(&response, &mut self.board).await else {
            return;
        };

        self.emit(SessionEvent::ToolCall(outcome.call.clone()));
        if outcome.board_changed {
            self.emit(SessionEvent::BoardUpdated(self.board.clone()));
        }

        match self.send(outcome.acknowledgment) {
            Ok(()) => self.follow_up_at = Some(Instant::now() + self.follow_up_delay),
            Err(err) => tracing::warn!(call_id = %outcome.call.call_id, "Failed to acknowledge tool call: {err}"),
        }
    }

    fn emit(&self, event: SessionEvent) {
        if let Err(err) = self.events.try_send(event) {
            match err {
                mpsc::error::TrySendError::Full(_) => tracing::warn!("Session event buffer full; dropping event"),
                mpsc::error::TrySendError::Closed(_) => tracing::trace!("No session event listener"),
            }
        }
    }
}

async fn next_peer_event(transport: Option<&mut RealtimeTransport>) -> PeerEvent {
    match transport {
        Some(transport) => transport.next_event().await,
        None => std::future::pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
