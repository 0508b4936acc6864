use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use envoy_bus::EventBus;
use envoy_core::config::EnvoyConfig;
use envoy_store::Store;
use tower_http::trace::TraceLayer;

use crate::http;

/// Central shared state, passed as `Arc<AppState>` to every handler. The
/// scheduler owns its own clones of `store`/`bus`/`agent` and runs as an
/// independent task — it is not reachable through `AppState` itself.
pub struct AppState {
    pub config: EnvoyConfig,
    pub store: Arc<Store>,
    pub bus: Arc<EventBus>,
    pub agent: Arc<envoy_agent::AgentRuntime>,
}

impl AppState {
    pub fn new(
        config: EnvoyConfig,
        store: Arc<Store>,
        bus: Arc<EventBus>,
        agent: Arc<envoy_agent::AgentRuntime>,
    ) -> Self {
        Self { config, store, bus, agent }
    }
}

/// Assemble the full Axum router. Every route lives under `/api/v1`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/health", get(http::health::health_handler))
        .route("/chat", post(http::chat::chat_handler))
        .route("/events", get(http::events::events_handler))
        .route(
            "/sessions",
            get(http::sessions::list_sessions_handler).post(http::sessions::create_session_handler),
        )
        .route(
            "/sessions/{id}",
            delete(http::sessions::delete_session_handler),
        )
        .route(
            "/sessions/{id}/messages",
            get(http::sessions::list_messages_handler),
        )
        .route("/tools", get(http::tools::list_tools_handler))
        .route("/tools/{name}", delete(http::tools::delete_tool_handler))
        .route(
            "/integrations",
            get(http::integrations::list_integrations_handler),
        )
        .route(
            "/integrations/{name}",
            delete(http::integrations::delete_integration_handler),
        )
        .route(
            "/integrations/{name}/config",
            post(http::integrations::set_integration_config_handler),
        )
        .route("/tasks", get(http::tasks::list_tasks_handler))
        .route("/tasks/{name}", delete(http::tasks::delete_task_handler))
        .route(
            "/tasks/{name}/runs",
            get(http::tasks::list_task_runs_handler),
        );

    Router::new()
        .nest("/api/v1", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
