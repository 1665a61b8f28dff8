//! Proxy to the local multimodal retrieval service.
//!
//! Retrieval is best effort: every failure degrades to an empty result so the
//! conversation is never blocked on it.

mod model;

pub use model::{
    ImageMatch, KnowledgeImage, KnowledgeResponse, KnowledgeResult, SearchData, SearchEnvelope,
    SearchRequest, TextMatch, DEFAULT_TOP_K,
};

use async_trait::async_trait;
use crate::{Error, Result};
use reqwest::Client;
use std::time::Duration;
use url::Url;

pub const DEFAULT_KNOWLEDGE_URL: &str = "http://localhost:8000";
pub const DEFAULT_IMAGE_BASE: &str = "/example-structuredDATA/images";
const SEARCH_MODE: &str = "multimodal";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const MESSAGE_OK: &str = "Knowledge retrieved successfully";
const MESSAGE_NOT_AVAILABLE: &str = "Knowledge database not available";
const MESSAGE_TEMPORARILY_UNAVAILABLE: &str = "Knowledge database temporarily unavailable";

/// Anything that can answer a knowledge query. Implementations never fail.
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    async fn search(&self, query: &str, top_k: usize) -> KnowledgeResult;
}

#[derive(Clone, Debug)]
pub struct KnowledgeClient {
    client: Client,
    search_url: Url,
    image_base: String,
}

impl KnowledgeClient {
    /// # Errors
    /// Returns an error if `base_url` is invalid or the HTTP client cannot be built.
    #[allow(clippy::result_large_err)]
    pub fn new(base_url: &str, image_base: impl Into<String>) -> Result<Self> {
        Self::new_with_timeout(base_url, image_base, DEFAULT_TIMEOUT)
    }

    /// # Errors
    /// Returns an error if `base_url` is invalid or the HTTP client cannot be built.
    #[allow(clippy::result_large_err)]
    pub fn new_with_timeout(base_url: &str, image_base: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let search_url = Url::parse(&format!("{}/search/text", base_url.trim_end_matches('/')))?;
        Ok(Self { client, search_url, image_base: image_base.into() })
    }

    /// Query the service and wrap the outcome in the HTTP envelope.
    pub async fn lookup(&self, query: &str, top_k: usize) -> KnowledgeResponse {
        tracing::info!(query, top_k, "Searching knowledge");
        match self.try_search(query, top_k).await {
            Ok(knowledge) => {
                tracing::debug!(
                    text_chunks = ?knowledge.text_chunks,
                    related_images = knowledge.related_images,
                    "Knowledge retrieved"
                );
                KnowledgeResponse { success: true, knowledge, message: MESSAGE_OK.to_string() }
            }
            Err(Error::UpstreamUnavailable(status)) => {
                tracing::warn!(%status, "Knowledge API not available, proceeding without retrieval");
                KnowledgeResponse::degraded(MESSAGE_NOT_AVAILABLE)
            }
            Err(err) => {
                tracing::warn!("Knowledge search failed: {err}");
                KnowledgeResponse::unavailable()
            }
        }
    }

    async fn try_search(&self, query: &str, top_k: usize) -> Result<KnowledgeResult> {
        let body = SearchRequest { query, top_k, mode: SEARCH_MODE };
        let res = self.client.post(self.search_url.clone()).json(&body).send().await?;

        let status = res.status();
        if !status.is_success() {
            return Err(Error::UpstreamUnavailable(status.to_string()));
        }

        let text = res.text().await?;
        tracing::trace!("Knowledge response: {}", crate::safe_truncate(&text, crate::TRACE_LOG_MAX_BYTES));
        let envelope: SearchEnvelope =
            serde_json::from_str(&text).map_err(|e| Error::Parse(e.to_string()))?;
        let data = envelope.data.unwrap_or_default();
        Ok(KnowledgeResult::from_matches(&data, &self.image_base))
    }
}

impl KnowledgeResponse {
    fn degraded(message: &str) -> Self {
        Self { success: true, knowledge: KnowledgeResult::empty(), message: message.to_string() }
    }

    /// Successful envelope with no knowledge, for failures that must not block the caller.
    #[must_use]
    pub fn unavailable() -> Self {
        Self::degraded(MESSAGE_TEMPORARILY_UNAVAILABLE)
    }
}

#[async_trait]
impl KnowledgeSource for KnowledgeClient {
    async fn search(&self, query: &str, top_k: usize) -> KnowledgeResult {
        self.lookup(query, top_k).await.knowledge
    }
}
