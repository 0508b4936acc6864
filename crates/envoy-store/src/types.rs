use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One user-visible row of transcript, kept for history listing. Not
/// authoritative for model replay — see [`ConversationState`] for that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Tool => "tool",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            "tool" => Ok(Role::Tool),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// One part of an assistant turn: either narrated text or a tool
/// invocation the model asked for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssistantPart {
    Text { text: String },
    ToolCall {
        tool_call_id: String,
        name: String,
        args: serde_json::Value,
    },
}

/// The result of one tool invocation, matched back to its call by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultPart {
    pub tool_call_id: String,
    pub name: String,
    pub result: String,
}

/// One authoritative entry in a session's conversation state. This is what
/// gets replayed into the model on the next turn — lossless, including
/// every tool call and tool result, in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ConversationEntry {
    User { content: String },
    Assistant { parts: Vec<AssistantPart> },
    Tool { results: Vec<ToolResultPart> },
}

/// Authoritative, serialized message list for one session. Stored as a
/// single JSON blob on the session row and replayed verbatim into the
/// model on the next turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    pub entries: Vec<ConversationEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomTool {
    pub id: String,
    pub name: String,
    pub description: String,
    pub input_schema: String,
    pub code: String,
    pub enabled: bool,
    pub integration_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigField {
    pub key: String,
    pub label: String,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Integration {
    pub id: String,
    pub name: String,
    pub description: String,
    pub config_schema: Vec<ConfigField>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub id: String,
    pub name: String,
    pub description: String,
    pub cron: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskRunStatus {
    Running,
    Success,
    Error,
}

impl std::fmt::Display for TaskRunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskRunStatus::Running => "running",
            TaskRunStatus::Success => "success",
            TaskRunStatus::Error => "error",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TaskRunStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(TaskRunStatus::Running),
            "success" => Ok(TaskRunStatus::Success),
            "error" => Ok(TaskRunStatus::Error),
            other => Err(format!("unknown task run status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRun {
    pub id: String,
    pub task_id: String,
    pub status: TaskRunStatus,
    pub result: Option<String>,
    pub output: Option<serde_json::Value>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_roundtrips_through_display_and_fromstr() {
        for role in [Role::User, Role::Assistant, Role::System, Role::Tool] {
            let s = role.to_string();
            let parsed: Role = s.parse().unwrap();
            assert_eq!(role, parsed);
        }
    }

    #[test]
    fn task_run_status_roundtrips() {
        for status in [
            TaskRunStatus::Running,
            TaskRunStatus::Success,
            TaskRunStatus::Error,
        ] {
            let s = status.to_string();
            let parsed: TaskRunStatus = s.parse().unwrap();
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn conversation_state_preserves_tool_call_entries_through_json() {
        let state = ConversationState {
            entries: vec![
                ConversationEntry::User {
                    content: "hello".into(),
                },
                ConversationEntry::Assistant {
                    parts: vec![
                        AssistantPart::Text {
                            text: "let me check".into(),
                        },
                        AssistantPart::ToolCall {
                            tool_call_id: "call_1".into(),
                            name: "get_weather".into(),
                            args: serde_json::json!({"city": "nyc"}),
                        },
                    ],
                },
                ConversationEntry::Tool {
                    results: vec![ToolResultPart {
                        tool_call_id: "call_1".into(),
                        name: "get_weather".into(),
                        result: "sunny".into(),
                    }],
                },
            ],
        };

        let json = serde_json::to_string(&state).unwrap();
        let back: ConversationState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.entries.len(), 3);
        match &back.entries[1] {
            ConversationEntry::Assistant { parts } => assert_eq!(parts.len(), 2),
            _ => panic!("expected assistant entry"),
        }
    }
}
