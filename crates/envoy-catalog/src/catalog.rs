use std::sync::Arc;

use envoy_store::Store;
use tracing::warn;

use crate::builtins::meta::{self, META_TOOL_NAMES};
use crate::builtins::{ListDirTool, ReadFileTool, WriteFileTool};
use crate::dynamic::DynamicTool;
use crate::integration::IntegrationManager;
use crate::schema;
use crate::tool::Tool;

const FS_BUILTIN_NAMES: &[&str] = &["read_file", "write_file", "list_dir"];

/// Assembles the full tool set for the next model step: the filesystem
/// built-ins, the always-available meta-tools that let the agent extend
/// itself, every enabled standalone custom tool, and every enabled tool
/// belonging to an enabled integration. Called fresh at the start of every
/// turn — no restart needed to pick up a tool a previous turn just created.
pub fn build_tools(
    store: Arc<Store>,
    fs_root: &str,
    env_file: &str,
) -> envoy_store::Result<Vec<Box<dyn Tool>>> {
    let mut tools: Vec<Box<dyn Tool>> = vec![
        Box::new(ReadFileTool {
            fs_root: fs_root.to_string(),
        }),
        Box::new(WriteFileTool {
            fs_root: fs_root.to_string(),
        }),
        Box::new(ListDirTool {
            fs_root: fs_root.to_string(),
        }),
    ];
    let integration_manager = Arc::new(IntegrationManager::new(env_file));
    tools.extend(meta::build(store.clone(), integration_manager));

    let all_tools = store.list_tools()?;
    let integrations = store.list_integrations()?;
    let enabled_integration_names: std::collections::HashMap<String, String> = integrations
        .iter()
        .filter(|i| i.enabled)
        .map(|i| (i.id.clone(), i.name.clone()))
        .collect();

    for row in all_tools.into_iter().filter(|t| t.enabled) {
        let exposed_name = match &row.integration_id {
            None => format!("custom_{}", row.name),
            Some(integration_id) => match enabled_integration_names.get(integration_id) {
                Some(integration_name) => format!("{integration_name}_{}", row.name),
                None => continue, // integration disabled or missing — skip its tools
            },
        };

        if FS_BUILTIN_NAMES.contains(&exposed_name.as_str())
            || META_TOOL_NAMES.contains(&exposed_name.as_str())
        {
            warn!(tool = exposed_name, "dynamic tool name collides with a built-in, skipping");
            continue;
        }

        let Some(schema) = schema::normalize(&exposed_name, &row.input_schema) else {
            continue;
        };

        tools.push(Box::new(DynamicTool {
            exposed_name,
            description: row.description,
            schema,
            code: row.code,
        }));
    }

    Ok(tools)
}
