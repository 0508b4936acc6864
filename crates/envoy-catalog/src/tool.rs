use async_trait::async_trait;
use serde_json::Value;

/// The outcome of one tool invocation. Errors are data fed back to the
/// model, never raised — `is_error` lets the caller label the result
/// without needing a separate Result type at this boundary.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// A named, schema-described callable invocable by the model. Implemented
/// by the built-ins (read_file, write_file, list_dir) and by
/// [`crate::dynamic::DynamicTool`] for custom/integration tools.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> String;
    fn description(&self) -> String;
    fn input_schema(&self) -> Value;
    async fn execute(&self, input: Value) -> ToolResult;
}

/// One entry of the tool definitions sent to the model alongside the
/// request.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

pub fn to_definitions(tools: &[Box<dyn Tool>]) -> Vec<ToolDefinition> {
    tools
        .iter()
        .map(|t| ToolDefinition {
            name: t.name(),
            description: t.description(),
            input_schema: t.input_schema(),
        })
        .collect()
}
