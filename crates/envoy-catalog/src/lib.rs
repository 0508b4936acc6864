mod builtins;
mod catalog;
mod dynamic;
mod integration;
mod schema;
mod tool;

pub use builtins::meta::META_TOOL_NAMES;
pub use catalog::build_tools;
pub use dynamic::DynamicTool;
pub use integration::{IntegrationError, IntegrationManager};
pub use schema::normalize as normalize_schema;
pub use tool::{to_definitions, Tool, ToolDefinition, ToolResult};
