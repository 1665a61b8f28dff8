use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorType {
    InvalidRequestError,
    RateLimitError,
    AuthenticationError,
    ServerError,
    #[serde(other)]
    Unknown,
}

/// Error payload carried by an inbound `error` event.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ServerError {
    #[serde(rename = "type")]
    pub error_type: ApiErrorType,
    pub code: Option<String>,
    pub message: String,
    pub param: Option<String>,
    pub event_id: Option<String>,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Session credential error: {0}")]
    SessionToken(String),

    #[error("Microphone access failed: {0}")]
    MediaAccess(String),

    #[error("SDP negotiation failed: {0}")]
    Negotiation(String),

    #[error("No open data channel to send on")]
    ChannelUnavailable,

    #[error("Failed to parse payload: {0}")]
    Parse(String),

    #[error("Knowledge service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("HTTP protocol error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse or serialize JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Header error: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "webrtc")]
    #[error("WebRTC error: {0}")]
    WebRtc(#[from] webrtc::Error),

    #[error("The session was closed")]
    ConnectionClosed,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
