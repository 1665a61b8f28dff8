use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// How a slide is laid out.
///
/// Formatting hints from the model (`title`, `paragraph`, ...) and any unrecognised
/// value collapse to `Text`; `bullet` is a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ContentKind {
    #[default]
    Text,
    Chart,
    List,
    Diagram,
    Images,
}

impl From<String> for ContentKind {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<&str> for ContentKind {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "chart" => Self::Chart,
            "list" | "bullet" => Self::List,
            "diagram" => Self::Diagram,
            "images" | "image" => Self::Images,
            _ => Self::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Bar,
    Pie,
    Line,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DataPoint {
    /// Data item label
    pub label: String,
    /// Data item value
    #[serde(deserialize_with = "lenient_number")]
    #[schemars(with = "f64")]
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChartSpec {
    #[serde(rename = "chartType", alias = "chart_type", default)]
    pub chart_type: ChartType,
    #[serde(default)]
    pub data: Vec<DataPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SlideImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One entry in the whiteboard history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slide {
    pub title: String,
    pub body: String,
    pub kind: ContentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<SlideImage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlighted_terms: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

/// Numbers may arrive as JSON numbers or as strings; anything unparseable counts as 0.
fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0),
        _ => 0.0,
    })
}
