use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};

const FS_BUILTIN_NAMES: &[&str] = &["read_file", "write_file", "list_dir"];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsView {
    pub built_in: Vec<String>,
    pub custom: Vec<envoy_store::CustomTool>,
}

/// GET /tools — the fixed built-in names (filesystem tools plus the
/// always-available meta-tools) alongside every stored custom/integration
/// tool, builtin or not, regardless of its enabled flag.
pub async fn list_tools_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ToolsView>> {
    let mut built_in: Vec<String> =
        FS_BUILTIN_NAMES.iter().map(|s| s.to_string()).collect();
    built_in.extend(
        envoy_catalog::META_TOOL_NAMES
            .iter()
            .map(|s| s.to_string()),
    );
    let custom = state.store.list_tools()?;
    Ok(Json(ToolsView { built_in, custom }))
}

pub async fn delete_tool_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<()> {
    if FS_BUILTIN_NAMES.contains(&name.as_str())
        || envoy_catalog::META_TOOL_NAMES.contains(&name.as_str())
    {
        return Err(ApiError::Validation(format!(
            "'{name}' is a built-in tool and cannot be deleted"
        )));
    }
    state.store.delete_tool(&name)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;
    use axum::extract::{Path, State};

    #[tokio::test]
    async fn cannot_delete_a_builtin_tool() {
        let state = test_state();
        let err = delete_tool_handler(State(state), Path("read_file".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn cannot_delete_a_meta_tool() {
        let state = test_state();
        let name = envoy_catalog::META_TOOL_NAMES[0].to_string();
        let err = delete_tool_handler(State(state), Path(name))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn deletes_a_custom_tool() {
        let state = test_state();
        state
            .store
            .create_tool(envoy_store::NewTool {
                name: "my_tool",
                description: "does a thing",
                input_schema: "{}",
                code: "export default () => {}",
                integration_id: None,
            })
            .unwrap();

        delete_tool_handler(State(state.clone()), Path("my_tool".to_string()))
            .await
            .unwrap();

        assert!(state.store.get_tool("my_tool").unwrap().is_none());
    }
}
