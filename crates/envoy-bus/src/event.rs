use serde::{Deserialize, Serialize};

/// One tool invocation the model asked for in this step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallEvent {
    #[serde(rename = "id")]
    pub tool_call_id: String,
    pub name: String,
    pub args: serde_json::Value,
}

/// The outcome of one tool invocation, matched back to its call by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultEvent {
    #[serde(rename = "id")]
    pub tool_call_id: String,
    pub name: String,
    pub result: String,
}

/// Everything the agent loop publishes for a turn, in strict order:
/// `Start` → (`Delta` | `ToolCalls` | `ToolResults`)* → `Done`. Wire
/// field names are camelCase (`sessionId`) to match the external SSE
/// contract, not the Rust-side snake_case identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Connected {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Start,
    Delta { content: String },
    ToolCalls { calls: Vec<ToolCallEvent> },
    ToolResults { results: Vec<ToolResultEvent> },
    Done { content: String },
}
