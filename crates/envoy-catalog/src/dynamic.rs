use async_trait::async_trait;
use serde_json::Value;

use crate::tool::{Tool, ToolResult};

/// A custom or integration-scoped tool whose body runs through the
/// sandboxed executor. `exposed_name` is the name the model sees
/// (`custom_<name>` or `<integration>_<name>`); `code` is the stored
/// function body.
pub struct DynamicTool {
    pub exposed_name: String,
    pub description: String,
    pub schema: Value,
    pub code: String,
}

#[async_trait]
impl Tool for DynamicTool {
    fn name(&self) -> String {
        self.exposed_name.clone()
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn input_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn execute(&self, input: Value) -> ToolResult {
        // A fresh read view of the environment on every call: a credential
        // saved a moment ago must be visible on the very next invocation.
        let env: std::collections::HashMap<String, String> = std::env::vars().collect();
        let output = envoy_sandbox::execute(&self.code, input, &env).await;
        if output.starts_with("Error") {
            ToolResult::error(output)
        } else {
            ToolResult::success(output)
        }
    }
}
