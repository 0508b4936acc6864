use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub cron: String,
    pub enabled: bool,
    pub last_run: Option<envoy_store::TaskRun>,
}

pub async fn list_tasks_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<TaskView>>> {
    let tasks = state.store.list_tasks()?;
    let mut views = Vec::with_capacity(tasks.len());
    for task in tasks {
        let last_run = state.store.list_task_runs(&task.id, 1)?.into_iter().next();
        views.push(TaskView {
            id: task.id,
            name: task.name,
            description: task.description,
            cron: task.cron,
            enabled: task.enabled,
            last_run,
        });
    }
    Ok(Json(views))
}

pub async fn delete_task_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<()> {
    state.store.delete_task(&name)?;
    Ok(())
}

#[derive(Deserialize)]
pub struct RunsQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    20
}

pub async fn list_task_runs_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<RunsQuery>,
) -> ApiResult<Json<Vec<envoy_store::TaskRun>>> {
    let task = state
        .store
        .get_task(&name)?
        .ok_or_else(|| ApiError::NotFound(format!("task not found: {name}")))?;
    let runs = state.store.list_task_runs(&task.id, query.limit)?;
    Ok(Json(runs))
}
