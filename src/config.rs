//! Environment-driven settings for the HTTP backend.

use crate::knowledge::{DEFAULT_IMAGE_BASE, DEFAULT_KNOWLEDGE_URL};
use crate::protocol::models::{DEFAULT_MODEL, DEFAULT_VOICE};
use crate::transport::rest::DEFAULT_REALTIME_URL;
use crate::{Error, Result};
use std::net::SocketAddr;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Missing keys are reported per request, not at startup.
    pub api_key: Option<String>,
    pub realtime_base: String,
    pub model: String,
    pub voice: String,
    pub knowledge_url: String,
    pub image_base: String,
    pub bind_addr: SocketAddr,
}

impl ServerConfig {
    /// Read settings from the process environment.
    ///
    /// # Errors
    /// `InvalidConfig` when `BIND_ADDR` is not a socket address.
    #[allow(clippy::result_large_err)]
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Blank values count as unset.
    ///
    /// # Errors
    /// `InvalidConfig` when `BIND_ADDR` is not a socket address.
    #[allow(clippy::result_large_err)]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let bind = or("BIND_ADDR", DEFAULT_BIND_ADDR);
        let bind_addr = bind
            .parse()
            .map_err(|e| Error::InvalidConfig(format!("BIND_ADDR {bind:?}: {e}")))?;

        Ok(Self {
            api_key: get("OPENAI_API_KEY"),
            realtime_base: or("REALTIME_API_BASE", DEFAULT_REALTIME_URL),
            model: or("REALTIME_MODEL", DEFAULT_MODEL),
            voice: or("REALTIME_VOICE", DEFAULT_VOICE),
            knowledge_url: or("KNOWLEDGE_API_URL", DEFAULT_KNOWLEDGE_URL),
            image_base: or("KNOWLEDGE_IMAGE_BASE", DEFAULT_IMAGE_BASE),
            bind_addr,
        })
    }
}
