use async_trait::async_trait;
use reqwest::{Client, header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE}};
use crate::error::{Error, Result};
use crate::protocol::models::{SessionConfig, SessionToken};
use serde_json::Value;
use std::time::Duration;
use url::Url;

pub const DEFAULT_REALTIME_URL: &str = "https://api.openai.com/v1/realtime";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Credential issuance and SDP exchange for a peer session.
#[async_trait]
pub trait Signaling: Send + Sync {
    /// Fetch a short-lived credential for the next session.
    async fn session_token(&self) -> Result<SessionToken>;

    /// Post the local offer and return the remote answer SDP.
    async fn exchange_sdp(&self, token: &str, offer_sdp: String) -> Result<String>;
}

/// Signaling over HTTP: a backend session endpoint plus the realtime SDP endpoint.
#[derive(Clone, Debug)]
pub struct HttpSignaling {
    client: Client,
    session_url: Url,
    realtime_url: Url,
    model: String,
}

impl HttpSignaling {
    /// # Errors
    /// Returns an error if either URL is invalid or the HTTP client cannot be built.
    #[allow(clippy::result_large_err)]
    pub fn new(session_url: &str, realtime_url: &str, model: impl Into<String>) -> Result<Self> {
        Self::new_with_timeouts(session_url, realtime_url, model, DEFAULT_TIMEOUT, DEFAULT_POOL_IDLE_TIMEOUT)
    }

    /// # Errors
    /// Returns an error if either URL is invalid or the HTTP client cannot be built.
    #[allow(clippy::result_large_err)]
    pub fn new_with_timeouts(
        session_url: &str,
        realtime_url: &str,
        model: impl Into<String>,
        timeout: Duration,
        pool_idle_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(pool_idle_timeout)
            .build()?;

        Ok(Self {
            client,
            session_url: Url::parse(session_url)?,
            realtime_url: Url::parse(realtime_url)?,
            model: model.into(),
        })
    }

    fn negotiation_url(&self) -> Url {
        let mut url = self.realtime_url.clone();
        url.query_pairs_mut().append_pair("model", &self.model);
        url
    }
}

#[async_trait]
impl Signaling for HttpSignaling {
    async fn session_token(&self) -> Result<SessionToken> {
        let res = self.client
            .get(self.session_url.clone())
            .send()
            .await
            .map_err(|e| Error::SessionToken(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            return Err(Error::SessionToken(format!("Session API failed: {status}")));
        }

        let token: SessionToken = res
            .json()
            .await
            .map_err(|e| Error::SessionToken(e.to_string()))?;
        token.secret()?;
        tracing::info!(session_id = ?token.id, "Session credential acquired");
        Ok(token)
    }

    async fn exchange_sdp(&self, token: &str, offer_sdp: String) -> Result<String> {
        let auth_header = HeaderValue::from_str(&format!("Bearer {token}"))?;

        let res = self.client
            .post(self.negotiation_url())
            .header(AUTHORIZATION, auth_header)
            .header(CONTENT_TYPE, "application/sdp")
            .body(offer_sdp)
            .send()
            .await
            .map_err(|e| Error::Negotiation(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            return Err(Error::Negotiation(format!("SDP exchange failed: {status}")));
        }

        res.text().await.map_err(|e| Error::Negotiation(e.to_string()))
    }
}

/// An adapter for the upstream realtime REST API, used server-side to mint sessions.
#[derive(Clone, Debug)]
pub struct RealtimeRestAdapter {
    client: Client,
    auth_header: HeaderValue,
    base_url: String,
}

impl RealtimeRestAdapter {
    /// Create a new adapter with the given API key.
    ///
    /// # Errors
    /// Returns an error if the API key results in an invalid header, the base URL is
    /// invalid, or the client build fails.
    #[allow(clippy::result_large_err)]
    pub fn new(api_key: &str, base_url: &str) -> Result<Self> {
        Self::new_with_timeouts(api_key, base_url, DEFAULT_TIMEOUT, DEFAULT_POOL_IDLE_TIMEOUT)
    }

    /// Create a new adapter with custom timeouts.
    ///
    /// # Errors
    /// Returns an error if the API key results in an invalid header, the base URL is
    /// invalid, or the client build fails.
    #[allow(clippy::result_large_err)]
    pub fn new_with_timeouts(
        api_key: &str,
        base_url: &str,
        timeout: Duration,
        pool_idle_timeout: Duration,
    ) -> Result<Self> {
        Url::parse(base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(pool_idle_timeout)
            .build()?;

        let auth_header = HeaderValue::from_str(&format!("Bearer {api_key}"))?;

        Ok(Self {
            client,
            auth_header,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create an ephemeral session and return the upstream JSON untouched.
    ///
    /// # Errors
    /// Returns `SessionToken` if the upstream call fails or answers with a non-success status.
    pub async fn create_session(&self, session: &SessionConfig) -> Result<Value> {
        tracing::info!("Requesting session from realtime API");
        let res = self.client
            .post(format!("{}/sessions", self.base_url))
            .header(AUTHORIZATION, &self.auth_header)
            .json(session)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            tracing::error!(%status, body = %crate::safe_truncate(&body, crate::TRACE_LOG_MAX_BYTES), "Realtime API rejected session request");
            return Err(Error::SessionToken(format!("Realtime API error: {status} {body}")));
        }

        let session: Value = res.json().await?;
        tracing::info!(session_id = ?session.get("id"), "Session created");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negotiation_url_carries_model() {
        let signaling = HttpSignaling::new(
            "http://localhost:3000/api/session",
            DEFAULT_REALTIME_URL,
            "gpt-4o-realtime-preview",
        )
        .unwrap();
        assert_eq!(
            signaling.negotiation_url().as_str(),
            "https://api.openai.com/v1/realtime?model=gpt-4o-realtime-preview"
        );
    }

    #[test]
    fn adapter_rejects_invalid_base_url() {
        let err = RealtimeRestAdapter::new("sk-test", "not a url").unwrap_err();
        assert!(matches!(err, Error::Url(_)));
    }
}
