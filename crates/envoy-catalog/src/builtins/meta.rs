use std::sync::Arc;

use async_trait::async_trait;
use envoy_core::cron;
use envoy_core::types::is_valid_identifier;
use envoy_store::{ConfigField, Store};
use serde_json::Value;

use crate::integration::IntegrationManager;
use crate::schema;
use crate::tool::{Tool, ToolResult};

fn str_field(input: &Value, field: &str) -> Result<String, ToolResult> {
    input
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ToolResult::error(format!("missing required field '{field}'")))
}

fn opt_str_field(input: &Value, field: &str) -> Option<String> {
    input.get(field).and_then(Value::as_str).map(str::to_string)
}

fn opt_bool_field(input: &Value, field: &str) -> Option<bool> {
    input.get(field).and_then(Value::as_bool)
}

macro_rules! try_field {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => return e,
        }
    };
}

fn object_schema(properties: serde_json::Value, required: &[&str]) -> Value {
    serde_json::json!({ "type": "object", "properties": properties, "required": required })
}

// ---- tools -----------------------------------------------------------

pub struct CreateToolTool {
    pub store: Arc<Store>,
}

#[async_trait]
impl Tool for CreateToolTool {
    fn name(&self) -> String {
        "create_tool".to_string()
    }
    fn description(&self) -> String {
        "Creates a new custom tool for yourself: a name, description, JSON Schema \
         for its input, and a JavaScript async-function body with access to \
         `input`, `http.fetch`, and `env`."
            .to_string()
    }
    fn input_schema(&self) -> Value {
        object_schema(
            serde_json::json!({
                "name": {"type": "string"},
                "description": {"type": "string"},
                "input_schema": {"type": "object"},
                "code": {"type": "string"},
            }),
            &["name", "description", "code"],
        )
    }
    async fn execute(&self, input: Value) -> ToolResult {
        let name = try_field!(str_field(&input, "name"));
        if !is_valid_identifier(&name) {
            return ToolResult::error(format!(
                "'{name}' is not a valid tool name: must be lowercase, start with a letter, and contain only letters, digits, and underscores"
            ));
        }
        let description = try_field!(str_field(&input, "description"));
        let code = try_field!(str_field(&input, "code"));
        let schema_str = input
            .get("input_schema")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({"type": "object"}))
            .to_string();
        if let Err(e) = schema::validate_new(&schema_str) {
            return ToolResult::error(e);
        }
        if let Err(e) = envoy_sandbox::compile_check(&code).await {
            return ToolResult::error(format!("code failed to compile: {e}"));
        }

        match self.store.create_tool(envoy_store::tool::NewTool {
            name: &name,
            description: &description,
            input_schema: &schema_str,
            code: &code,
            integration_id: None,
        }) {
            Ok(_) => ToolResult::success(format!("created tool '{name}', exposed as custom_{name}")),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

pub struct UpdateToolTool {
    pub store: Arc<Store>,
}

#[async_trait]
impl Tool for UpdateToolTool {
    fn name(&self) -> String {
        "update_tool".to_string()
    }
    fn description(&self) -> String {
        "Updates an existing custom tool's description, input schema, code, or \
         enabled flag. Omitted fields are left unchanged."
            .to_string()
    }
    fn input_schema(&self) -> Value {
        object_schema(
            serde_json::json!({
                "name": {"type": "string"},
                "description": {"type": "string"},
                "input_schema": {"type": "object"},
                "code": {"type": "string"},
                "enabled": {"type": "boolean"},
            }),
            &["name"],
        )
    }
    async fn execute(&self, input: Value) -> ToolResult {
        let name = try_field!(str_field(&input, "name"));
        let code = opt_str_field(&input, "code");
        if let Some(ref code) = code {
            if let Err(e) = envoy_sandbox::compile_check(code).await {
                return ToolResult::error(format!("code failed to compile: {e}"));
            }
        }
        let schema_str = input.get("input_schema").map(|v| v.to_string());
        if let Some(ref schema_str) = schema_str {
            if let Err(e) = schema::validate_new(schema_str) {
                return ToolResult::error(e);
            }
        }
        let description = opt_str_field(&input, "description");
        let enabled = opt_bool_field(&input, "enabled");

        match self.store.update_tool(
            &name,
            envoy_store::tool::ToolUpdate {
                description: description.as_deref(),
                input_schema: schema_str.as_deref(),
                code: code.as_deref(),
                enabled,
            },
        ) {
            Ok(_) => ToolResult::success(format!("updated tool '{name}'")),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

pub struct DeleteToolTool {
    pub store: Arc<Store>,
}

#[async_trait]
impl Tool for DeleteToolTool {
    fn name(&self) -> String {
        "delete_tool".to_string()
    }
    fn description(&self) -> String {
        "Deletes a custom tool you previously created.".to_string()
    }
    fn input_schema(&self) -> Value {
        object_schema(serde_json::json!({ "name": {"type": "string"} }), &["name"])
    }
    async fn execute(&self, input: Value) -> ToolResult {
        let name = try_field!(str_field(&input, "name"));
        match self.store.delete_tool(&name) {
            Ok(()) => ToolResult::success(format!("deleted tool '{name}'")),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

pub struct ListToolsTool {
    pub store: Arc<Store>,
}

#[async_trait]
impl Tool for ListToolsTool {
    fn name(&self) -> String {
        "list_tools".to_string()
    }
    fn description(&self) -> String {
        "Lists every custom tool you've created, standalone and integration-owned.".to_string()
    }
    fn input_schema(&self) -> Value {
        object_schema(serde_json::json!({}), &[])
    }
    async fn execute(&self, _input: Value) -> ToolResult {
        match self.store.list_tools() {
            Ok(tools) if tools.is_empty() => ToolResult::success("no custom tools yet"),
            Ok(tools) => {
                let lines: Vec<String> = tools
                    .iter()
                    .map(|t| {
                        let status = if t.enabled { "enabled" } else { "disabled" };
                        format!("- {} ({status}): {}", t.name, t.description)
                    })
                    .collect();
                ToolResult::success(lines.join("\n"))
            }
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

pub struct TestToolTool {
    pub store: Arc<Store>,
}

#[async_trait]
impl Tool for TestToolTool {
    fn name(&self) -> String {
        "test_tool".to_string()
    }
    fn description(&self) -> String {
        "Runs a custom tool's code directly against a sample input, without \
         going through the model, so you can check it before relying on it."
            .to_string()
    }
    fn input_schema(&self) -> Value {
        object_schema(
            serde_json::json!({
                "name": {"type": "string"},
                "input": {"type": "object"},
            }),
            &["name"],
        )
    }
    async fn execute(&self, input: Value) -> ToolResult {
        let name = try_field!(str_field(&input, "name"));
        let tool_input = input.get("input").cloned().unwrap_or(Value::Null);

        let tool = match self.store.get_tool(&name) {
            Ok(Some(tool)) => tool,
            Ok(None) => return ToolResult::error(format!("no custom tool named '{name}'")),
            Err(e) => return ToolResult::error(e.to_string()),
        };

        let env: std::collections::HashMap<String, String> = std::env::vars().collect();
        let output = envoy_sandbox::execute(&tool.code, tool_input, &env).await;
        ToolResult::success(output)
    }
}

pub struct CreateIntegrationTool {
    pub store: Arc<Store>,
}

#[async_trait]
impl Tool for CreateIntegrationTool {
    fn name(&self) -> String {
        "create_integration".to_string()
    }
    fn description(&self) -> String {
        "Creates a named integration with a declared credential schema, so related \
         tools can share configured secrets."
            .to_string()
    }
    fn input_schema(&self) -> Value {
        object_schema(
            serde_json::json!({
                "name": {"type": "string"},
                "description": {"type": "string"},
                "config_schema": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "key": {"type": "string"},
                            "label": {"type": "string"},
                            "required": {"type": "boolean"}
                        }
                    }
                }
            }),
            &["name", "description"],
        )
    }
    async fn execute(&self, input: Value) -> ToolResult {
        let name = try_field!(str_field(&input, "name"));
        if !is_valid_identifier(&name) {
            return ToolResult::error(format!(
                "'{name}' is not a valid integration name: lowercase, starts with a letter, letters/digits/underscore only"
            ));
        }
        let description = try_field!(str_field(&input, "description"));
        let config_schema: Vec<ConfigField> = match input.get("config_schema") {
            Some(v) => match serde_json::from_value(v.clone()) {
                Ok(schema) => schema,
                Err(e) => return ToolResult::error(format!("invalid config_schema: {e}")),
            },
            None => Vec::new(),
        };

        match self
            .store
            .create_integration(&name, &description, &config_schema)
        {
            Ok(_) => ToolResult::success(format!("created integration '{name}'")),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

pub struct AddIntegrationToolTool {
    pub store: Arc<Store>,
}

#[async_trait]
impl Tool for AddIntegrationToolTool {
    fn name(&self) -> String {
        "add_integration_tool".to_string()
    }
    fn description(&self) -> String {
        "Adds a new tool to an existing integration, exposed to you as \
         `<integration>_<name>`."
            .to_string()
    }
    fn input_schema(&self) -> Value {
        object_schema(
            serde_json::json!({
                "integration": {"type": "string"},
                "name": {"type": "string"},
                "description": {"type": "string"},
                "input_schema": {"type": "object"},
                "code": {"type": "string"},
            }),
            &["integration", "name", "description", "code"],
        )
    }
    async fn execute(&self, input: Value) -> ToolResult {
        let integration_name = try_field!(str_field(&input, "integration"));
        let name = try_field!(str_field(&input, "name"));
        if !is_valid_identifier(&name) {
            return ToolResult::error(format!("'{name}' is not a valid tool name"));
        }
        let description = try_field!(str_field(&input, "description"));
        let code = try_field!(str_field(&input, "code"));
        let schema_str = input
            .get("input_schema")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({"type": "object"}))
            .to_string();
        if let Err(e) = schema::validate_new(&schema_str) {
            return ToolResult::error(e);
        }
        if let Err(e) = envoy_sandbox::compile_check(&code).await {
            return ToolResult::error(format!("code failed to compile: {e}"));
        }

        let integration = match self.store.get_integration(&integration_name) {
            Ok(Some(i)) => i,
            Ok(None) => return ToolResult::error(format!("no integration named '{integration_name}'")),
            Err(e) => return ToolResult::error(e.to_string()),
        };

        match self.store.create_tool(envoy_store::tool::NewTool {
            name: &name,
            description: &description,
            input_schema: &schema_str,
            code: &code,
            integration_id: Some(&integration.id),
        }) {
            Ok(_) => ToolResult::success(format!(
                "added tool '{name}' to integration '{integration_name}', exposed as {integration_name}_{name}"
            )),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

pub struct RemoveIntegrationToolTool {
    pub store: Arc<Store>,
}

#[async_trait]
impl Tool for RemoveIntegrationToolTool {
    fn name(&self) -> String {
        "remove_integration_tool".to_string()
    }
    fn description(&self) -> String {
        "Removes a tool previously added to an integration.".to_string()
    }
    fn input_schema(&self) -> Value {
        object_schema(
            serde_json::json!({
                "integration": {"type": "string"},
                "name": {"type": "string"},
            }),
            &["integration", "name"],
        )
    }
    async fn execute(&self, input: Value) -> ToolResult {
        let integration_name = try_field!(str_field(&input, "integration"));
        let name = try_field!(str_field(&input, "name"));

        let tool = match self.store.get_tool(&name) {
            Ok(Some(tool)) => tool,
            Ok(None) => return ToolResult::error(format!("no tool named '{name}'")),
            Err(e) => return ToolResult::error(e.to_string()),
        };
        let integration = match self.store.get_integration(&integration_name) {
            Ok(Some(i)) => i,
            Ok(None) => return ToolResult::error(format!("no integration named '{integration_name}'")),
            Err(e) => return ToolResult::error(e.to_string()),
        };
        if tool.integration_id.as_deref() != Some(integration.id.as_str()) {
            return ToolResult::error(format!(
                "tool '{name}' does not belong to integration '{integration_name}'"
            ));
        }

        match self.store.delete_tool(&name) {
            Ok(()) => ToolResult::success(format!("removed tool '{name}' from '{integration_name}'")),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

pub struct DeleteIntegrationTool {
    pub store: Arc<Store>,
}

#[async_trait]
impl Tool for DeleteIntegrationTool {
    fn name(&self) -> String {
        "delete_integration".to_string()
    }
    fn description(&self) -> String {
        "Deletes an integration and every tool that belongs to it.".to_string()
    }
    fn input_schema(&self) -> Value {
        object_schema(serde_json::json!({ "name": {"type": "string"} }), &["name"])
    }
    async fn execute(&self, input: Value) -> ToolResult {
        let name = try_field!(str_field(&input, "name"));
        match self.store.delete_integration(&name) {
            Ok(()) => ToolResult::success(format!("deleted integration '{name}'")),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

pub struct ListIntegrationsTool {
    pub store: Arc<Store>,
    pub integrations: Arc<IntegrationManager>,
}

#[async_trait]
impl Tool for ListIntegrationsTool {
    fn name(&self) -> String {
        "list_integrations".to_string()
    }
    fn description(&self) -> String {
        "Lists every integration you've created, with its configuration status.".to_string()
    }
    fn input_schema(&self) -> Value {
        object_schema(serde_json::json!({}), &[])
    }
    async fn execute(&self, _input: Value) -> ToolResult {
        match self.store.list_integrations() {
            Ok(integrations) if integrations.is_empty() => {
                ToolResult::success("no integrations yet")
            }
            Ok(integrations) => {
                let lines: Vec<String> = integrations
                    .iter()
                    .map(|i| {
                        let configured = self.integrations.is_configured(&i.config_schema);
                        let badge = match (i.enabled, configured) {
                            (false, _) => "disabled",
                            (true, true) => "configured",
                            (true, false) => "needs setup",
                        };
                        format!("- {} ({badge}): {}", i.name, i.description)
                    })
                    .collect();
                ToolResult::success(lines.join("\n"))
            }
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

pub struct ScheduleTaskTool {
    pub store: Arc<Store>,
}

#[async_trait]
impl Tool for ScheduleTaskTool {
    fn name(&self) -> String {
        "schedule_task".to_string()
    }
    fn description(&self) -> String {
        "Schedules yourself to run again later on a cron expression. When it \
         fires, you're re-entered under a fresh session with the task's \
         description as your instruction."
            .to_string()
    }
    fn input_schema(&self) -> Value {
        object_schema(
            serde_json::json!({
                "name": {"type": "string"},
                "description": {"type": "string"},
                "cron": {"type": "string"},
            }),
            &["name", "description", "cron"],
        )
    }
    async fn execute(&self, input: Value) -> ToolResult {
        let name = try_field!(str_field(&input, "name"));
        if !is_valid_identifier(&name) {
            return ToolResult::error(format!("'{name}' is not a valid task name"));
        }
        let description = try_field!(str_field(&input, "description"));
        let expr = try_field!(str_field(&input, "cron"));
        if let Err(e) = cron::validate(&expr) {
            return ToolResult::error(format!("invalid cron expression: {e}"));
        }

        match self.store.create_task(&name, &description, &expr) {
            Ok(_) => ToolResult::success(format!("scheduled task '{name}' ({expr})")),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

pub struct UpdateScheduledTaskTool {
    pub store: Arc<Store>,
}

#[async_trait]
impl Tool for UpdateScheduledTaskTool {
    fn name(&self) -> String {
        "update_scheduled_task".to_string()
    }
    fn description(&self) -> String {
        "Updates a scheduled task's description, cron expression, or enabled flag."
            .to_string()
    }
    fn input_schema(&self) -> Value {
        object_schema(
            serde_json::json!({
                "name": {"type": "string"},
                "description": {"type": "string"},
                "cron": {"type": "string"},
                "enabled": {"type": "boolean"},
            }),
            &["name"],
        )
    }
    async fn execute(&self, input: Value) -> ToolResult {
        let name = try_field!(str_field(&input, "name"));
        let description = opt_str_field(&input, "description");
        let expr = opt_str_field(&input, "cron");
        if let Some(ref expr) = expr {
            if let Err(e) = cron::validate(expr) {
                return ToolResult::error(format!("invalid cron expression: {e}"));
            }
        }
        let enabled = opt_bool_field(&input, "enabled");

        match self
            .store
            .update_task(&name, description.as_deref(), expr.as_deref(), enabled)
        {
            Ok(_) => ToolResult::success(format!("updated task '{name}'")),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

pub struct DeleteScheduledTaskTool {
    pub store: Arc<Store>,
}

#[async_trait]
impl Tool for DeleteScheduledTaskTool {
    fn name(&self) -> String {
        "delete_scheduled_task".to_string()
    }
    fn description(&self) -> String {
        "Deletes a scheduled task and its run history.".to_string()
    }
    fn input_schema(&self) -> Value {
        object_schema(serde_json::json!({ "name": {"type": "string"} }), &["name"])
    }
    async fn execute(&self, input: Value) -> ToolResult {
        let name = try_field!(str_field(&input, "name"));
        match self.store.delete_task(&name) {
            Ok(()) => ToolResult::success(format!("deleted task '{name}'")),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

pub struct ListScheduledTasksTool {
    pub store: Arc<Store>,
}

#[async_trait]
impl Tool for ListScheduledTasksTool {
    fn name(&self) -> String {
        "list_scheduled_tasks".to_string()
    }
    fn description(&self) -> String {
        "Lists every scheduled task and its cron expression.".to_string()
    }
    fn input_schema(&self) -> Value {
        object_schema(serde_json::json!({}), &[])
    }
    async fn execute(&self, _input: Value) -> ToolResult {
        match self.store.list_tasks() {
            Ok(tasks) if tasks.is_empty() => ToolResult::success("no scheduled tasks yet"),
            Ok(tasks) => {
                let lines: Vec<String> = tasks
                    .iter()
                    .map(|t| {
                        let status = if t.enabled { "enabled" } else { "disabled" };
                        format!("- {} ({status}, cron `{}`): {}", t.name, t.cron, t.description)
                    })
                    .collect();
                ToolResult::success(lines.join("\n"))
            }
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

pub const META_TOOL_NAMES: &[&str] = &[
    "create_tool",
    "update_tool",
    "delete_tool",
    "list_tools",
    "test_tool",
    "create_integration",
    "add_integration_tool",
    "remove_integration_tool",
    "delete_integration",
    "list_integrations",
    "schedule_task",
    "update_scheduled_task",
    "delete_scheduled_task",
    "list_scheduled_tasks",
];

pub fn build(store: Arc<Store>, integrations: Arc<IntegrationManager>) -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(CreateToolTool { store: store.clone() }),
        Box::new(UpdateToolTool { store: store.clone() }),
        Box::new(DeleteToolTool { store: store.clone() }),
        Box::new(ListToolsTool { store: store.clone() }),
        Box::new(TestToolTool { store: store.clone() }),
        Box::new(CreateIntegrationTool { store: store.clone() }),
        Box::new(AddIntegrationToolTool { store: store.clone() }),
        Box::new(RemoveIntegrationToolTool { store: store.clone() }),
        Box::new(DeleteIntegrationTool { store: store.clone() }),
        Box::new(ListIntegrationsTool {
            store: store.clone(),
            integrations,
        }),
        Box::new(ScheduleTaskTool { store: store.clone() }),
        Box::new(UpdateScheduledTaskTool { store: store.clone() }),
        Box::new(DeleteScheduledTaskTool { store: store.clone() }),
        Box::new(ListScheduledTasksTool { store }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_tool_rejects_bad_identifier() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let tool = CreateToolTool { store };
        let result = tool
            .execute(serde_json::json!({
                "name": "Not-Valid",
                "description": "x",
                "code": "return 1;"
            }))
            .await;
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn create_tool_rejects_uncompilable_code() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let tool = CreateToolTool { store };
        let result = tool
            .execute(serde_json::json!({
                "name": "broken",
                "description": "x",
                "code": "this is not js("
            }))
            .await;
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn create_then_list_tools_round_trips() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let create = CreateToolTool { store: store.clone() };
        create
            .execute(serde_json::json!({
                "name": "echo_city",
                "description": "echoes the city",
                "code": "return input.city;"
            }))
            .await;
        let list = ListToolsTool { store };
        let result = list.execute(Value::Null).await;
        assert!(result.content.contains("echo_city"));
    }

    #[tokio::test]
    async fn schedule_task_rejects_bad_cron() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let tool = ScheduleTaskTool { store };
        let result = tool
            .execute(serde_json::json!({
                "name": "daily_digest",
                "description": "send a digest",
                "cron": "not a cron"
            }))
            .await;
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn schedule_task_accepts_five_field_cron() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let tool = ScheduleTaskTool { store };
        let result = tool
            .execute(serde_json::json!({
                "name": "daily_digest",
                "description": "send a digest",
                "cron": "0 9 * * *"
            }))
            .await;
        assert!(!result.is_error);
    }
}
