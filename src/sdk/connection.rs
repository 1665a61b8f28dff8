use crate::protocol::client_events::ClientEvent;
use crate::transport::peer::{
    AudioConstraints, AudioTrack, DataChannel, MediaDevices, PeerConfig, PeerConnection, PeerEvent,
    PeerFactory, TrackSender, DATA_CHANNEL_LABEL,
};
use crate::transport::rest::Signaling;
use crate::{Error, Result};
use std::sync::Arc;

/// Collaborators needed to open a transport.
#[derive(Clone)]
pub struct Backends {
    pub signaling: Arc<dyn Signaling>,
    pub peers: Arc<dyn PeerFactory>,
    pub media: Arc<dyn MediaDevices>,
    pub peer_config: PeerConfig,
    pub audio: AudioConstraints,
}

/// A negotiated peer connection with its control data channel.
pub struct RealtimeTransport {
    peer: Box<dyn PeerConnection>,
    channel: Arc<dyn DataChannel>,
    senders: Vec<TrackSender>,
    microphone: Option<Arc<dyn AudioTrack>>,
    placeholder: Option<Arc<dyn AudioTrack>>,
    session_id: Option<String>,
    events_done: bool,
}

struct Negotiated {
    channel: Arc<dyn DataChannel>,
    senders: Vec<TrackSender>,
    microphone: Arc<dyn AudioTrack>,
}

impl RealtimeTransport {
    /// Fetch a credential, capture the microphone and run the offer/answer exchange.
    ///
    /// Everything acquired along the way is released when a step fails.
    ///
    /// # Errors
    /// `SessionToken`, `MediaAccess` or `Negotiation` depending on the failing step.
    pub async fn connect(backends: &Backends) -> Result<Self> {
        let token = backends.signaling.session_token().await?;
        let secret = token.secret()?.to_string();

        let mut peer = backends.peers.create(&backends.peer_config).await?;
        match Self::negotiate(peer.as_mut(), backends, &secret).await {
            Ok(negotiated) => {
                tracing::info!(session_id = ?token.id, "Peer connection negotiated");
                Ok(Self {
                    peer,
                    channel: negotiated.channel,
                    senders: negotiated.senders,
                    microphone: Some(negotiated.microphone),
                    placeholder: None,
                    session_id: token.id,
                    events_done: false,
                })
            }
            Err(err) => {
                peer.close().await;
                Err(err)
            }
        }
    }

    async fn negotiate(
        peer: &mut dyn PeerConnection,
        backends: &Backends,
        secret: &str,
    ) -> Result<Negotiated> {
        let microphone = backends
            .media
            .microphone(backends.audio)
            .await
            .map_err(as_media_error)?;

        match Self::offer_answer(peer, backends, secret, &microphone).await {
            Ok((channel, senders)) => Ok(Negotiated { channel, senders, microphone }),
            Err(err) => {
                microphone.stop();
                Err(err)
            }
        }
    }

    async fn offer_answer(
        peer: &mut dyn PeerConnection,
        backends: &Backends,
        secret: &str,
        microphone: &Arc<dyn AudioTrack>,
    ) -> Result<(Arc<dyn DataChannel>, Vec<TrackSender>)> {
        let sender = peer.add_track(Arc::clone(microphone)).await?;
        let channel = peer.create_data_channel(DATA_CHANNEL_LABEL.to_string()).await?;

        let offer = peer.create_offer().await.map_err(as_negotiation_error)?;
        peer.set_local_description(offer.clone())
            .await
            .map_err(as_negotiation_error)?;

        let answer = backends.signaling.exchange_sdp(secret, offer).await?;
        peer.set_remote_description(answer)
            .await
            .map_err(as_negotiation_error)?;

        Ok((channel, vec![sender]))
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    #[must_use]
    pub fn is_channel_open(&self) -> bool {
        self.channel.is_open()
    }

    #[must_use]
    pub fn is_microphone_live(&self) -> bool {
        self.microphone.is_some()
    }

    /// Serialize and send a client event, stamping an event id when absent.
    ///
    /// # Errors
    /// `ChannelUnavailable` when the data channel is not open.
    #[allow(clippy::result_large_err)]
    pub fn send(&self, mut event: ClientEvent) -> Result<()> {
        if !self.channel.is_open() {
            tracing::warn!(kind = event.kind(), "Data channel not open; dropping event");
            return Err(Error::ChannelUnavailable);
        }
        event.ensure_event_id();
        let json = serde_json::to_string(&event)?;
        tracing::trace!("Sending event: {}", crate::safe_truncate(&json, crate::TRACE_LOG_MAX_BYTES));
        self.channel.send_text(json)
    }

    /// Swap the outgoing audio between the live microphone and a silent track.
    ///
    /// # Errors
    /// `MediaAccess` if the microphone cannot be reacquired, or the stack's
    /// error if a track cannot be replaced.
    pub async fn set_microphone(&mut self, enabled: bool, media: &dyn MediaDevices, constraints: AudioConstraints) -> Result<()> {
        if enabled == self.microphone.is_some() {
            return Ok(());
        }

        let next = if enabled {
            media.microphone(constraints).await.map_err(as_media_error)?
        } else {
            media.silent_track()
        };

        for sender in self.senders.clone() {
            if let Err(err) = self.peer.replace_track(sender, Arc::clone(&next)).await {
                next.stop();
                return Err(err);
            }
        }

        if enabled {
            if let Some(placeholder) = self.placeholder.take() {
                placeholder.stop();
            }
            self.microphone = Some(next);
            tracing::info!("Microphone enabled");
        } else {
            if let Some(microphone) = self.microphone.take() {
                microphone.stop();
            }
            self.placeholder = Some(next);
            tracing::info!("Microphone muted");
        }
        Ok(())
    }

    /// Next peer event. Once the peer's event stream ends this never resolves.
    pub async fn next_event(&mut self) -> PeerEvent {
        if !self.events_done {
            if let Some(event) = self.peer.next_event().await {
                return event;
            }
            tracing::warn!("Peer event stream ended");
            self.events_done = true;
        }
        std::future::pending().await
    }

    /// Close the channel and the peer, and stop every local track.
    pub async fn close(mut self) {
        self.channel.close();
        self.peer.close().await;
        if let Some(microphone) = self.microphone.take() {
            microphone.stop();
        }
        if let Some(placeholder) = self.placeholder.take() {
            placeholder.stop();
        }
        tracing::debug!(session_id = ?self.session_id, "Transport closed");
    }
}

fn as_media_error(err: Error) -> Error {
    match err {
        Error::MediaAccess(_) => err,
        other => Error::MediaAccess(other.to_string()),
    }
}

fn as_negotiation_error(err: Error) -> Error {
    match err {
        Error::Negotiation(_) => err,
        other => Error::Negotiation(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::testing::Rig;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn connect_negotiates_with_live_microphone() {
        let rig = Rig::new();
        let transport = RealtimeTransport::connect(&rig.backends()).await.unwrap();
        assert_eq!(transport.session_id(), Some("sess_0"));
        assert!(transport.is_microphone_live());
        assert!(!transport.is_channel_open());
        assert_eq!(rig.peers.created(), 1);

        transport.close().await;
        assert!(rig.peers.peer(0).is_closed());
        assert!(rig.media.tracks()[0].is_stopped());
    }

    #[tokio::test]
    async fn token_failure_creates_no_peer() {
        let rig = Rig::new();
        rig.signaling.fail.store(true, Ordering::SeqCst);
        let err = RealtimeTransport::connect(&rig.backends()).await.err().unwrap();
        assert!(matches!(err, Error::SessionToken(_)));
        assert_eq!(rig.peers.created(), 0);
        assert!(rig.media.tracks().is_empty());
    }

    #[tokio::test]
    async fn send_stamps_event_ids_once_open() {
        let rig = Rig::new();
        let transport = RealtimeTransport::connect(&rig.backends()).await.unwrap();
        rig.peers.peer(0).channel.open();

        transport.send(ClientEvent::response_create()).unwrap();
        let sent = rig.peers.peer(0).channel.sent();
        assert_eq!(sent[0]["type"], "response.create");
        assert!(sent[0]["event_id"].as_str().is_some_and(|id| !id.is_empty()));
    }
}
