use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::error::ApiResult;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: String,
    pub title: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<envoy_store::Session> for SessionView {
    fn from(s: envoy_store::Session) -> Self {
        Self { id: s.id, title: s.title, created_at: s.created_at, updated_at: s.updated_at }
    }
}

pub async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<SessionView>>> {
    let sessions = state.store.list_sessions()?;
    Ok(Json(sessions.into_iter().map(SessionView::from).collect()))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

pub async fn create_session_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> ApiResult<Json<SessionView>> {
    let id = req
        .session_id
        .unwrap_or_else(|| envoy_core::types::SessionId::new().to_string());
    let session = state.store.get_or_create_session(&id)?;
    Ok(Json(session.into()))
}

pub async fn delete_session_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.store.delete_session(&id)?;
    Ok(())
}

pub async fn list_messages_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<envoy_store::Message>>> {
    let messages = state.store.list_messages(&id)?;
    Ok(Json(messages))
}
