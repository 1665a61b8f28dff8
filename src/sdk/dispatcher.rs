use crate::knowledge::{KnowledgeResult, KnowledgeSource, DEFAULT_TOP_K};
use crate::protocol::client_events::ClientEvent;
use crate::protocol::models::{Item, Response};
use crate::whiteboard::Whiteboard;
use serde_json::json;
use std::sync::Arc;

use super::tools::{ToolCall, ToolCommand};

/// What came of a handled tool call.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub call: ToolCall,
    pub command: ToolCommand,
    /// `conversation.item.create` carrying the function call output.
    pub acknowledgment: ClientEvent,
    pub board_changed: bool,
}

/// Turns completed responses into whiteboard changes and acknowledgments.
#[derive(Clone, Default)]
pub struct Dispatcher {
    knowledge: Option<Arc<dyn KnowledgeSource>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(knowledge: Option<Arc<dyn KnowledgeSource>>) -> Self {
        Self { knowledge }
    }

    /// The function call in a response's first output item, if any.
    #[must_use]
    pub fn tool_call(response: &Response) -> Option<ToolCall> {
        match response.first_output()? {
            Item::FunctionCall { name, call_id, arguments, .. } => Some(ToolCall {
                name: name.clone(),
                call_id: call_id.clone(),
                arguments: arguments.clone(),
            }),
            _ => None,
        }
    }

    /// Handle a `response.done`. Returns `None` when there is nothing to acknowledge.
    pub async fn handle_response(&self, response: &Response, board: &mut Whiteboard) -> Option<ToolOutcome> {
        let call = Self::tool_call(response)?;
        tracing::info!(name = %call.name, call_id = %call.call_id, "Tool call received");

        let command = match ToolCommand::parse(&call.name, &call.arguments) {
            Ok(command) => command,
            Err(err) => {
                tracing::warn!(name = %call.name, "Dropping tool call: {err}");
                return None;
            }
        };

        let mut output = json!({
            "response": format!("Tool call {} executed successfully.", call.name),
        });
        let mut board_changed = false;

        match &command {
            ToolCommand::Whiteboard(cmd) => {
                board.apply(cmd);
                board_changed = true;
            }
            ToolCommand::SearchKnowledge(args) => {
                let knowledge = match &self.knowledge {
                    Some(source) => source.search(&args.query, args.top_k.unwrap_or(DEFAULT_TOP_K)).await,
                    None => {
                        tracing::debug!("No knowledge source configured");
                        KnowledgeResult::empty()
                    }
                };
                output["knowledge"] = serde_json::to_value(knowledge).unwrap_or_default();
            }
            ToolCommand::Unknown(name) => {
                tracing::warn!(name = %name, "Unknown tool call");
            }
        }

        let acknowledgment = ClientEvent::item_create(Item::function_call_output(
            call.call_id.clone(),
            output.to_string(),
        ));
        Some(ToolOutcome { call, command, acknowledgment, board_changed })
    }
}
