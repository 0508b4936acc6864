use async_trait::async_trait;
use serde_json::{json, Value};

use super::fs_root;
use crate::tool::{Tool, ToolResult};

const MAX_ENTRIES: usize = 1_000;

pub struct ListDirTool {
    pub fs_root: String,
}

#[async_trait]
impl Tool for ListDirTool {
    fn name(&self) -> String {
        "list_dir".to_string()
    }

    fn description(&self) -> String {
        "List files and directories under a path in the workspace.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Path relative to the workspace root, defaults to '.'"}
            }
        })
    }

    async fn execute(&self, input: Value) -> ToolResult {
        let path = input.get("path").and_then(|v| v.as_str()).unwrap_or(".");
        let resolved = match fs_root::resolve(&self.fs_root, path) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(e),
        };

        let mut entries = match tokio::fs::read_dir(&resolved).await {
            Ok(rd) => rd,
            Err(e) => return ToolResult::error(format!("failed to list '{path}': {e}")),
        };

        let mut rows = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            if rows.len() >= MAX_ENTRIES {
                break;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let meta = match entry.metadata().await {
                Ok(m) => m,
                Err(_) => continue,
            };
            let kind = if meta.is_dir() { "dir" } else { "file" };
            rows.push(format!("[{kind}] {name} ({} bytes)", meta.len()));
        }
        rows.sort();

        if rows.is_empty() {
            ToolResult::success("(empty directory)")
        } else {
            ToolResult::success(rows.join("\n"))
        }
    }
}
