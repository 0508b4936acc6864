use tokio::sync::RwLock;

use crate::provider::LlmProvider;

/// Holds the one configured LLM endpoint, the current default model, and
/// the path to the integration credentials env file. Shared across all
/// sessions via Arc in the gateway's app state.
pub struct AgentRuntime {
    provider: Box<dyn LlmProvider>,
    default_model: RwLock<String>,
    env_file: String,
}

impl AgentRuntime {
    pub fn new(provider: Box<dyn LlmProvider>, default_model: String, env_file: String) -> Self {
        Self {
            provider,
            default_model: RwLock::new(default_model),
            env_file,
        }
    }

    pub fn env_file(&self) -> &str {
        &self.env_file
    }

    pub async fn get_model(&self) -> String {
        self.default_model.read().await.clone()
    }

    pub async fn set_model(&self, model: String) -> String {
        let mut guard = self.default_model.write().await;
        std::mem::replace(&mut *guard, model)
    }

    pub fn provider(&self) -> &dyn LlmProvider {
        &*self.provider
    }
}
