use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub config_schema: Vec<envoy_store::ConfigField>,
    pub enabled: bool,
    pub tools: Vec<envoy_store::CustomTool>,
    pub configured: bool,
    pub masked_values: HashMap<String, Option<String>>,
}

pub async fn list_integrations_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<IntegrationView>>> {
    let integrations = state.store.list_integrations()?;
    let manager = envoy_catalog::IntegrationManager::new(state.config.tools.env_file.clone());

    let mut views = Vec::with_capacity(integrations.len());
    for integration in integrations {
        let tools = state.store.list_tools_for_integration(&integration.id)?;
        let configured = manager.is_configured(&integration.config_schema);
        let masked_values = manager.masked_values(&integration.config_schema);
        views.push(IntegrationView {
            id: integration.id,
            name: integration.name,
            description: integration.description,
            config_schema: integration.config_schema,
            enabled: integration.enabled,
            tools,
            configured,
            masked_values,
        });
    }
    Ok(Json(views))
}

pub async fn delete_integration_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<()> {
    state.store.delete_integration(&name)?;
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigReply {
    pub configured: bool,
    pub masked_values: HashMap<String, Option<String>>,
}

/// POST /integrations/:name/config — body is `{key: value, ...}`; keys not
/// declared by the integration's config_schema are silently dropped.
pub async fn set_integration_config_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(values): Json<HashMap<String, String>>,
) -> ApiResult<Json<ConfigReply>> {
    let integration = state
        .store
        .get_integration(&name)?
        .ok_or_else(|| ApiError::NotFound(format!("integration not found: {name}")))?;

    let manager = envoy_catalog::IntegrationManager::new(state.config.tools.env_file.clone());
    manager
        .save_config(&integration, &values)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    Ok(Json(ConfigReply {
        configured: manager.is_configured(&integration.config_schema),
        masked_values: manager.masked_values(&integration.config_schema),
    }))
}
