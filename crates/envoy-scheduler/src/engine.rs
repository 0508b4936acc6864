use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use envoy_bus::EventBus;
use envoy_core::types::SessionId;
use envoy_core::cron::compute_next_run;
use envoy_store::{Store, TaskRunStatus};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::error::Result;

/// Polls `envoy_store::Store` for scheduled tasks and re-enters the agent
/// loop under a synthetic session when one comes due. Next-fire times are
/// kept in memory only — the store holds the task's configuration (cron
/// expression, enabled flag), not scheduling state, so a restart simply
/// recomputes everything from "now".
pub struct SchedulerEngine {
    store: Arc<Store>,
    bus: Arc<EventBus>,
    runtime: Arc<envoy_agent::AgentRuntime>,
    fs_root: String,
    next_run: HashMap<String, DateTime<Utc>>,
    cron_seen: HashMap<String, String>,
}

impl SchedulerEngine {
    pub fn new(
        store: Arc<Store>,
        bus: Arc<EventBus>,
        runtime: Arc<envoy_agent::AgentRuntime>,
        fs_root: String,
    ) -> Self {
        Self {
            store,
            bus,
            runtime,
            fs_root,
            next_run: HashMap::new(),
            cron_seen: HashMap::new(),
        }
    }

    /// Main loop. Polls every second until `shutdown` broadcasts `true`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("scheduler engine started");
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        error!("scheduler tick error: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scheduler engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    async fn tick(&mut self) -> Result<()> {
        let tasks = self.store.list_tasks()?;
        let now = Utc::now();
        let seen_ids: std::collections::HashSet<String> =
            tasks.iter().map(|t| t.id.clone()).collect();
        self.next_run.retain(|id, _| seen_ids.contains(id));
        self.cron_seen.retain(|id, _| seen_ids.contains(id));

        for task in tasks {
            if !task.enabled {
                self.next_run.remove(&task.id);
                continue;
            }

            let cron_changed = self.cron_seen.get(&task.id) != Some(&task.cron);
            if cron_changed || !self.next_run.contains_key(&task.id) {
                self.cron_seen.insert(task.id.clone(), task.cron.clone());
                match compute_next_run(&task.cron, now) {
                    Some(next) => {
                        self.next_run.insert(task.id.clone(), next);
                    }
                    None => {
                        warn!(task = %task.name, cron = %task.cron, "unable to compute next run, skipping");
                        self.next_run.remove(&task.id);
                        continue;
                    }
                }
            }

            let due = self.next_run.get(&task.id).is_some_and(|t| *t <= now);
            if !due {
                continue;
            }

            // Always advance past this occurrence, whether or not we
            // actually fire it, so a slow/overlapping run doesn't wedge
            // the scheduler into firing the same instant forever.
            if let Some(next) = compute_next_run(&task.cron, now) {
                self.next_run.insert(task.id.clone(), next);
            } else {
                self.next_run.remove(&task.id);
            }

            if self.store.task_has_running_run(&task.id)? {
                warn!(task = %task.name, "previous run still in progress, skipping this fire");
                continue;
            }

            self.fire(task);
        }

        Ok(())
    }

    fn fire(&self, task: envoy_store::ScheduledTask) {
        let store = Arc::clone(&self.store);
        let bus = Arc::clone(&self.bus);
        let runtime = Arc::clone(&self.runtime);
        let fs_root = self.fs_root.clone();

        tokio::spawn(async move {
            let run = match store.start_task_run(&task.id) {
                Ok(run) => run,
                Err(e) => {
                    error!(task = %task.name, "failed to start task run: {e}");
                    return;
                }
            };

            let session_id = SessionId::synthetic_for_run(&run.id);
            let before = store
                .get_conversation_state(session_id.as_str())
                .map(|s| s.entries.len())
                .unwrap_or(0);

            info!(task = %task.name, run_id = %run.id, "firing scheduled task");

            let outcome = envoy_agent::run_turn(
                store.clone(),
                &bus,
                &runtime,
                &fs_root,
                session_id.as_str(),
                &task.description,
            )
            .await;

            match outcome {
                Ok(text) => {
                    let trace = extract_trace(&store, session_id.as_str(), before);
                    if let Err(e) =
                        store.finish_task_run(&run.id, TaskRunStatus::Success, &text, &trace)
                    {
                        error!(task = %task.name, "failed to record task run result: {e}");
                    }
                }
                Err(e) => {
                    let message = e.to_string();
                    if let Err(e) = store.finish_task_run(
                        &run.id,
                        TaskRunStatus::Error,
                        &message,
                        &serde_json::json!([]),
                    ) {
                        error!(task = %task.name, "failed to record task run error: {e}");
                    }
                }
            }
        });
    }
}

/// Walks the conversation entries this run appended and flattens them into
/// a JSON trace: assistant text, tool calls, and tool results in order.
/// Malformed or empty parts are skipped rather than failing the whole run.
fn extract_trace(store: &Store, session_id: &str, before: usize) -> serde_json::Value {
    let state = match store.get_conversation_state(session_id) {
        Ok(s) => s,
        Err(_) => return serde_json::json!([]),
    };

    let mut trace = Vec::new();
    for entry in state.entries.into_iter().skip(before) {
        match entry {
            envoy_store::ConversationEntry::User { .. } => {}
            envoy_store::ConversationEntry::Assistant { parts } => {
                for part in parts {
                    match part {
                        envoy_store::AssistantPart::Text { text } if !text.is_empty() => {
                            trace.push(serde_json::json!({ "type": "text", "text": text }));
                        }
                        envoy_store::AssistantPart::ToolCall { name, args, .. } => {
                            trace.push(
                                serde_json::json!({ "type": "tool_call", "name": name, "args": args }),
                            );
                        }
                        _ => {}
                    }
                }
            }
            envoy_store::ConversationEntry::Tool { results } => {
                for result in results {
                    trace.push(serde_json::json!({
                        "type": "tool_result",
                        "name": result.name,
                        "result": result.result,
                    }));
                }
            }
        }
    }

    serde_json::Value::Array(trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use envoy_agent::{ChatRequest, ChatResponse, LlmProvider, ProviderError};

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

    fn test_engine() -> (SchedulerEngine, Arc<Store>) {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let bus = Arc::new(EventBus::new());
        let runtime = Arc::new(envoy_agent::AgentRuntime::new(
            Box::new(EchoProvider),
            "echo-model".to_string(),
            "/nonexistent/.envoy.env".to_string(),
        ));
        let engine = SchedulerEngine::new(store.clone(), bus, runtime, "/tmp".to_string());
        (engine, store)
    }

    #[tokio::test]
    async fn disabled_task_is_skipped_and_forgotten() {
        let (mut engine, store) = test_engine();
        let task = store.create_task("nightly", "do nothing", "* * * * * *").unwrap();
        store.update_task("nightly", None, None, Some(false)).unwrap();

        engine.tick().await.unwrap();

        assert!(!engine.next_run.contains_key(&task.id));
        assert_eq!(store.list_task_runs(&task.id, 10).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn not_yet_due_task_does_not_fire() {
        let (mut engine, store) = test_engine();
        let task = store.create_task("weekly", "do nothing", "0 0 0 * * SUN").unwrap();

        engine.tick().await.unwrap();

        assert!(engine.next_run.contains_key(&task.id));
        assert_eq!(store.list_task_runs(&task.id, 10).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn running_task_is_not_refired() {
        let (mut engine, store) = test_engine();
        let task = store.create_task("busy", "do nothing", "* * * * * *").unwrap();
        store.start_task_run(&task.id).unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        engine.tick().await.unwrap();

        assert_eq!(store.list_task_runs(&task.id, 10).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn due_enabled_task_fires_and_records_a_run() {
        let (mut engine, store) = test_engine();
        let task = store.create_task("greet", "say hello", "* * * * * *").unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        engine.tick().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;

        assert_eq!(store.list_task_runs(&task.id, 10).unwrap().len(), 1);
    }
}
