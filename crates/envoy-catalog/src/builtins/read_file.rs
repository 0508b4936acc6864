use async_trait::async_trait;
use serde_json::{json, Value};

use super::fs_root;
use crate::tool::{Tool, ToolResult};

const MAX_OUTPUT_CHARS: usize = 30_000;

pub struct ReadFileTool {
    pub fs_root: String,
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> String {
        "read_file".to_string()
    }

    fn description(&self) -> String {
        "Read a text file from the workspace. Optional offset/limit select a line range."
            .to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Path relative to the workspace root"},
                "offset": {"type": "integer", "description": "1-based starting line"},
                "limit": {"type": "integer", "description": "Maximum number of lines to return"}
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, input: Value) -> ToolResult {
        let Some(path) = input.get("path").and_then(|v| v.as_str()) else {
            return ToolResult::error("missing required field 'path'");
        };
        let resolved = match fs_root::resolve(&self.fs_root, path) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(e),
        };

        let content = match tokio::fs::read_to_string(&resolved).await {
            Ok(c) => c,
            Err(e) => return ToolResult::error(format!("failed to read '{path}': {e}")),
        };

        let offset = input.get("offset").and_then(|v| v.as_u64()).unwrap_or(1) as usize;
        let limit = input.get("limit").and_then(|v| v.as_u64()).map(|v| v as usize);

        let lines: Vec<&str> = content.lines().collect();
        let start = offset.saturating_sub(1).min(lines.len());
        let end = match limit {
            Some(l) => (start + l).min(lines.len()),
            None => lines.len(),
        };
        let mut selected = lines[start..end].join("\n");

        if selected.chars().count() > MAX_OUTPUT_CHARS {
            let truncated: String = selected.chars().take(MAX_OUTPUT_CHARS).collect();
            selected = format!("{truncated}\n[output truncated at {MAX_OUTPUT_CHARS} characters]");
        }

        ToolResult::success(selected)
    }
}
