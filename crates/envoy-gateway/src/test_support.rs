//! Shared test fixtures for the HTTP handler test modules. Not compiled
//! outside `#[cfg(test)]`.

use std::sync::Arc;

use async_trait::async_trait;
use envoy_agent::{ChatRequest, ChatResponse, LlmProvider, ProviderError};

use crate::app::AppState;

struct EchoProvider;

#[async_trait]
impl LlmProvider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    async fn send(&self, _req: &ChatRequest) -> std::result::Result<ChatResponse, ProviderError> {
        Ok(ChatResponse {
            content: "ok".to_string(),
            model: "echo-model".to_string(),
            tokens_in: 1,
            tokens_out: 1,
            stop_reason: "end_turn".to_string(),
            tool_calls: Vec::new(),
        })
    }
}

pub fn test_state() -> Arc<AppState> {
    let config = envoy_core::EnvoyConfig::default();
    let store = Arc::new(envoy_store::Store::open_in_memory().unwrap());
    let bus = Arc::new(envoy_bus::EventBus::new());
    let agent = Arc::new(envoy_agent::AgentRuntime::new(
        Box::new(EchoProvider),
        "echo-model".to_string(),
        "/nonexistent/.envoy.env".to_string(),
    ));
    Arc::new(AppState::new(config, store, bus, agent))
}
