//! POST /chat — one turn of the agent loop over HTTP.
//!
//! Request:  `{"sessionId": "...", "message": "..."}` (sessionId optional,
//!           a fresh one is minted and created if omitted)
//! Response: `{"sessionId": "...", "message": "..."}`
//! Error:    `{"error": "..."}`
//!
//! Streaming deltas are not carried on this response — subscribe to
//! `GET /events?sessionId=...` before or after posting to observe the
//! turn as it happens. This handler returns only once the turn is done.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub session_id: String,
    pub message: String,
}

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<Json<ChatReply>> {
    if req.message.trim().is_empty() {
        return Err(ApiError::Validation("message cannot be empty".to_string()));
    }

    let session_id = req
        .session_id
        .unwrap_or_else(|| envoy_core::types::SessionId::new().to_string());

    let reply = envoy_agent::run_turn(
        state.store.clone(),
        &state.bus,
        &state.agent,
        &state.config.tools.fs_root,
        &session_id,
        &req.message,
    )
    .await?;

    Ok(Json(ChatReply { session_id, message: reply }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;

    #[tokio::test]
    async fn empty_message_is_rejected_before_touching_the_agent() {
        let state = test_state();
        let req = ChatRequest {
            session_id: None,
            message: "   ".to_string(),
        };
        let err = chat_handler(State(state), Json(req)).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
