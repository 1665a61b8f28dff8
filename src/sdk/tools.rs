use crate::protocol::models::Tool;
use crate::whiteboard::{
    ClearWhiteboard, Command, CreateSection, DisplayContent, DisplayData, HighlightText,
};
use crate::{Error, Result};
use schemars::schema::RootSchema;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

pub const DEFAULT_INSTRUCTIONS: &str = "\
You are a teaching assistant that turns a spoken lecture into a live whiteboard presentation.

Listen to the lecturer and keep the whiteboard in step with what they say:
- Use display_content (or add_content) for the main points. Pick the type that fits: \
\"title\" for lesson titles, \"subtitle\" for section headings, \"bullet\" for key facts, \
\"paragraph\" for longer explanations and \"highlight\" for critical information. \
Put the terms students should remember in highlightedTerms.
- Use display_data when numbers, comparisons or proportions come up. \
Bar charts suit comparisons and rankings; pie charts suit parts of a whole.
- Use create_section when the lecture moves to a new major topic, and clear_whiteboard \
when a new lesson starts or the lecturer asks for a clean board.
- Use highlight_text to draw attention to a phrase already on the board.
- Use search_knowledge when the lecturer refers to course material you should look up, \
and ground your answer in what it returns.

Work proactively without waiting for explicit instructions. Keep spoken replies short and \
natural; the board carries the detail.";

/// A registered tool: name, description and argument schema.
#[derive(Clone, Debug)]
pub struct ToolDefinition {
    pub name: String,
    pub description: Option<String>,
    pub schema: RootSchema,
}

/// A function call emitted by the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCall {
    pub name: String,
    pub call_id: String,
    pub arguments: String,
}

/// Arguments of `search_knowledge`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct SearchKnowledge {
    /// What to look up in the course material
    pub query: String,
    /// How many matches to return (default 3)
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// A parsed tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCommand {
    Whiteboard(Command),
    SearchKnowledge(SearchKnowledge),
    Unknown(String),
}

impl ToolCommand {
    /// Parse the JSON-encoded `arguments` of a call named `name`.
    ///
    /// Unknown names still parse (to `Unknown`) as long as the arguments are valid JSON.
    ///
    /// # Errors
    /// `Parse` when the arguments are not JSON or do not fit the tool's shape.
    #[allow(clippy::result_large_err)]
    pub fn parse(name: &str, arguments: &str) -> Result<Self> {
        let arguments = arguments.trim();
        let value: Value = if arguments.is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(arguments).map_err(|e| Error::Parse(format!("{name}: {e}")))?
        };

        let command = match name {
            "display_content" | "add_content" => Self::Whiteboard(Command::DisplayContent(decode(name, value)?)),
            "display_data" => Self::Whiteboard(Command::DisplayData(decode(name, value)?)),
            "create_section" => Self::Whiteboard(Command::CreateSection(decode(name, value)?)),
            "highlight_text" => Self::Whiteboard(Command::Highlight(decode(name, value)?)),
            "clear_whiteboard" => Self::Whiteboard(Command::Clear),
            "search_knowledge" => Self::SearchKnowledge(decode(name, value)?),
            other => Self::Unknown(other.to_string()),
        };
        Ok(command)
    }
}

#[allow(clippy::result_large_err)]
fn decode<T: DeserializeOwned>(name: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::Parse(format!("{name}: {e}")))
}

#[derive(Clone, Debug, Default)]
pub struct ToolRegistry {
    defs: Vec<ToolDefinition>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every tool the whiteboard session understands.
    #[must_use]
    pub fn whiteboard() -> Self {
        let mut registry = Self::new();
        registry
            .tool::<DisplayContent>(
                "display_content",
                "Display content on the whiteboard: text, a list, a chart, a diagram or images.",
            )
            .tool::<DisplayContent>(
                "add_content",
                "Add text content to the whiteboard while the lecturer is explaining something.",
            )
            .require(&["content", "type"])
            .tool::<DisplayData>(
                "display_data",
                "Display a chart for numerical information, comparisons or statistics.",
            )
            .tool::<ClearWhiteboard>(
                "clear_whiteboard",
                "Clear the whiteboard when starting a new topic or when asked to.",
            )
            .tool::<CreateSection>(
                "create_section",
                "Start a new section or topic on the whiteboard.",
            )
            .require(&["section_title"])
            .tool::<HighlightText>(
                "highlight_text",
                "Emphasize a word or phrase on the current slide.",
            )
            .tool::<SearchKnowledge>(
                "search_knowledge",
                "Search the course knowledge base for passages and figures related to a query.",
            );
        registry
    }

    #[must_use]
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.defs
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Register a tool whose arguments are described by `TArgs`.
    pub fn tool<TArgs: JsonSchema>(&mut self, name: &str, description: impl Into<String>) -> &mut Self {
        let schema = schemars::schema_for!(TArgs);
        self.defs.push(ToolDefinition {
            name: name.to_string(),
            description: Some(description.into()),
            schema,
        });
        self
    }

    /// Mark `fields` required in the schema of the last registered tool.
    ///
    /// Decoding stays lenient; this only shapes what the model is told.
    pub fn require(&mut self, fields: &[&str]) -> &mut Self {
        if let Some(def) = self.defs.last_mut() {
            let object = def.schema.schema.object();
            object.required.extend(fields.iter().map(|field| (*field).to_string()));
        }
        self
    }

    /// Convert all registered tools into protocol-level tool definitions.
    ///
    /// # Errors
    /// Returns an error if schema serialization fails.
    // Keep a single public error type for the SDK surface.
    #[allow(clippy::result_large_err)]
    pub fn try_as_tools(&self) -> Result<Vec<Tool>> {
        let mut tools = Vec::with_capacity(self.defs.len());
        for def in &self.defs {
            let parameters = serde_json::to_value(&def.schema)?;
            tools.push(Tool::Function {
                name: def.name.clone(),
                description: def.description.clone(),
                parameters,
            });
        }
        Ok(tools)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lists_every_tool() {
        let tools = ToolRegistry::whiteboard().try_as_tools().unwrap();
        let names: Vec<&str> = tools.iter().map(Tool::name).collect();
        assert_eq!(
            names,
            vec![
                "display_content",
                "add_content",
                "display_data",
                "clear_whiteboard",
                "create_section",
                "highlight_text",
                "search_knowledge"
            ]
        );
        let Tool::Function { parameters, .. } = &tools[5];
        assert!(parameters["properties"].get("text").is_some());
    }

    fn parameters(name: &str) -> Value {
        ToolRegistry::whiteboard()
            .try_as_tools()
            .unwrap()
            .into_iter()
            .find_map(|tool| match tool {
                Tool::Function { name: n, parameters, .. } if n == name => Some(parameters),
                Tool::Function { .. } => None,
            })
            .unwrap()
    }

    #[test]
    fn schemas_mark_required_fields() {
        assert_eq!(parameters("add_content")["required"], serde_json::json!(["content", "type"]));
        assert_eq!(parameters("create_section")["required"], serde_json::json!(["section_title"]));
        assert!(parameters("display_content").get("required").is_none());
        assert_eq!(parameters("search_knowledge")["required"], serde_json::json!(["query"]));

        // requirements do not make decoding strict
        let command = ToolCommand::parse("create_section", "{}").unwrap();
        assert!(matches!(command, ToolCommand::Whiteboard(Command::CreateSection(_))));
    }

    #[test]
    fn chart_choice_is_bar_or_pie() {
        let chart = &parameters("display_data")["properties"]["chart"];
        assert_eq!(chart["enum"], serde_json::json!(["bar", "pie"]));
        assert_eq!(chart["type"], "string");
    }

    #[test]
    fn parses_known_commands() {
        let command = ToolCommand::parse("add_content", r#"{"content":"x","type":"bullet"}"#).unwrap();
        assert!(matches!(command, ToolCommand::Whiteboard(Command::DisplayContent(_))));

        let command = ToolCommand::parse("clear_whiteboard", "").unwrap();
        assert_eq!(command, ToolCommand::Whiteboard(Command::Clear));

        let command = ToolCommand::parse("search_knowledge", r#"{"query":"cells"}"#).unwrap();
        assert_eq!(
            command,
            ToolCommand::SearchKnowledge(SearchKnowledge { query: "cells".to_string(), top_k: None })
        );
    }

    #[test]
    fn unknown_name_is_not_an_error() {
        let command = ToolCommand::parse("draw_unicorn", "{}").unwrap();
        assert_eq!(command, ToolCommand::Unknown("draw_unicorn".to_string()));
    }

    #[test]
    fn malformed_arguments_fail() {
        assert!(matches!(ToolCommand::parse("display_content", "{not json"), Err(Error::Parse(_))));
        assert!(matches!(ToolCommand::parse("search_knowledge", "{}"), Err(Error::Parse(_))));
    }
}
