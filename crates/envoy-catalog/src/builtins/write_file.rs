use async_trait::async_trait;
use serde_json::{json, Value};

use super::fs_root;
use crate::tool::{Tool, ToolResult};

pub struct WriteFileTool {
    pub fs_root: String,
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> String {
        "write_file".to_string()
    }

    fn description(&self) -> String {
        "Write (overwrite) a text file in the workspace, creating parent directories as needed."
            .to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Path relative to the workspace root"},
                "content": {"type": "string"}
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, input: Value) -> ToolResult {
        let Some(path) = input.get("path").and_then(|v| v.as_str()) else {
            return ToolResult::error("missing required field 'path'");
        };
        let Some(content) = input.get("content").and_then(|v| v.as_str()) else {
            return ToolResult::error("missing required field 'content'");
        };
        let resolved = match fs_root::resolve(&self.fs_root, path) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(e),
        };

        if let Some(parent) = resolved.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return ToolResult::error(format!("failed to create parent directories: {e}"));
            }
        }

        match tokio::fs::write(&resolved, content).await {
            Ok(()) => ToolResult::success(format!("wrote {} bytes to '{path}'", content.len())),
            Err(e) => ToolResult::error(format!("failed to write '{path}': {e}")),
        }
    }
}
