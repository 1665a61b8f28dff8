use serde::{Deserialize, Serialize};

pub const DEFAULT_TOP_K: usize = 3;

/// Body of the retrieval service's `/search/text` endpoint.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    pub top_k: usize,
    pub mode: &'static str,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchEnvelope {
    #[serde(default)]
    pub data: Option<SearchData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchData {
    #[serde(default)]
    pub text_results: Vec<TextMatch>,
    #[serde(default)]
    pub image_results: Vec<ImageMatch>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TextMatch {
    #[serde(default)]
    pub chapter_name: Option<String>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ImageMatch {
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub image_description: Option<String>,
    #[serde(default)]
    pub chapter_name: Option<String>,
    #[serde(default)]
    pub similarity_score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeImage {
    pub url: String,
    pub description: String,
    pub chapter: String,
    pub similarity: f64,
}

/// Normalized knowledge handed to the model and to HTTP callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeResult {
    pub context_text: String,
    pub related_images: usize,
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_chunks: Option<usize>,
    pub images: Vec<KnowledgeImage>,
}

impl KnowledgeResult {
    /// The result used whenever the retrieval service cannot answer.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.context_text.is_empty() && self.images.is_empty()
    }

    /// Fold raw matches into the normalized shape.
    #[must_use]
    pub fn from_matches(data: &SearchData, image_base: &str) -> Self {
        let context_text = data
            .text_results
            .iter()
            .enumerate()
            .map(|(index, item)| {
                format!(
                    "{}. Source: {}\nContent: {}",
                    index + 1,
                    item.chapter_name.as_deref().unwrap_or_default(),
                    item.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let base = image_base.trim_end_matches('/');
        let images: Vec<KnowledgeImage> = data
            .image_results
            .iter()
            .map(|item| KnowledgeImage {
                url: format!("{base}/{}", item.image_url.trim_start_matches('/')),
                description: item.image_description.clone().unwrap_or_default(),
                chapter: item.chapter_name.clone().unwrap_or_default(),
                similarity: item.similarity_score.unwrap_or_default(),
            })
            .collect();

        let mut sources: Vec<String> = Vec::new();
        let chapters = data
            .text_results
            .iter()
            .map(|item| item.chapter_name.as_deref())
            .chain(data.image_results.iter().map(|item| item.chapter_name.as_deref()));
        for chapter in chapters.flatten() {
            if !chapter.is_empty() && !sources.iter().any(|s| s == chapter) {
                sources.push(chapter.to_string());
            }
        }

        Self {
            context_text,
            related_images: images.len(),
            sources,
            text_chunks: Some(data.text_results.len()),
            images,
        }
    }
}

/// Envelope returned by `POST /api/knowledge/search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeResponse {
    pub success: bool,
    pub knowledge: KnowledgeResult,
    pub message: String,
}
