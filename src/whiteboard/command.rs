use schemars::r#gen::SchemaGenerator;
use schemars::schema::{InstanceType, Schema, SchemaObject};
use schemars::JsonSchema;
use serde::Deserialize;

use super::slide::{ChartSpec, ChartType, ContentKind, DataPoint, SlideImage};

/// Arguments of `display_content` and `add_content`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, JsonSchema)]
pub struct DisplayContent {
    /// The title or heading for this content section
    #[serde(default)]
    pub title: Option<String>,
    /// The main content text to display on the whiteboard (markdown)
    #[serde(default)]
    pub content: Option<String>,
    /// Layout or formatting: text, chart, list, diagram, images, or one of
    /// title, subtitle, bullet, paragraph, highlight
    #[serde(default, rename = "type")]
    #[schemars(with = "Option<String>")]
    pub kind: Option<ContentKind>,
    /// Chart to draw when the type is chart
    #[serde(default)]
    pub chart: Option<ChartSpec>,
    /// List entries when the type is list
    #[serde(default)]
    pub items: Option<Vec<String>>,
    /// Images to show with the content
    #[serde(default)]
    pub images: Option<Vec<SlideImage>>,
    /// A single term to emphasize
    #[serde(default, rename = "highlightedText")]
    pub highlighted_text: Option<String>,
    /// Terms to emphasize
    #[serde(default, rename = "highlightedTerms")]
    pub highlighted_terms: Option<Vec<String>>,
}

/// Arguments of `display_data`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, JsonSchema)]
pub struct DisplayData {
    /// The most appropriate chart type for the data
    #[serde(default)]
    #[schemars(schema_with = "bar_or_pie")]
    pub chart: ChartType,
    /// The title of the chart that will be displayed
    #[serde(default)]
    pub title: Option<String>,
    /// Optional explanatory text to display with the chart
    #[serde(default)]
    pub text: Option<String>,
    /// Data to display in the chart
    #[serde(default)]
    pub data: Vec<DataPoint>,
}

/// Arguments of `create_section`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct CreateSection {
    /// The title of the new section
    #[serde(default)]
    pub section_title: String,
}

/// Arguments of `highlight_text`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct HighlightText {
    /// Text to emphasize on the current slide; empty clears emphasis
    #[serde(default)]
    pub text: String,
    /// Additional terms to emphasize
    #[serde(default)]
    pub terms: Option<Vec<String>>,
}

/// Arguments of `clear_whiteboard`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct ClearWhiteboard {}

/// A state transition of the whiteboard.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    DisplayContent(DisplayContent),
    DisplayData(DisplayData),
    CreateSection(CreateSection),
    Highlight(HighlightText),
    Clear,
}

/// The model is offered bar and pie; `line` is still accepted on decode.
fn bar_or_pie(_: &mut SchemaGenerator) -> Schema {
    SchemaObject {
        instance_type: Some(InstanceType::String.into()),
        enum_values: Some(vec!["bar".into(), "pie".into()]),
        ..Default::default()
    }
    .into()
}

impl DisplayData {
    pub(crate) fn chart_spec(&self) -> ChartSpec {
        ChartSpec { chart_type: self.chart, data: self.data.clone() }
    }
}

impl DisplayContent {
    /// Explicit terms, falling back to the single highlighted text.
    pub(crate) fn terms(&self) -> Option<Vec<String>> {
        self.highlighted_terms
            .clone()
            .or_else(|| self.highlighted_text.clone().map(|text| vec![text]))
    }
}
