use envoy_store::{Integration, ScheduledTask, Store};

/// 2-tier system prompt for Anthropic prompt caching.
///
/// TIER 1 (static): identity + safety + operating rules — identical across
/// every turn, every session. cache_control: {type: "ephemeral"} so it's a
/// cache hit on every call after the first.
/// TIER 2 (volatile): the current catalog — custom tools, integrations
/// (with configured/needs-setup badges) and scheduled tasks — rebuilt on
/// every turn because it changes as the agent extends itself. Placed last,
/// uncached, so it never invalidates tier 1's cache prefix.
#[derive(Debug, Clone)]
pub struct SystemPrompt {
    pub static_tier: String,
    pub volatile_tier: String,
}

impl SystemPrompt {
    pub fn to_plain_text(&self) -> String {
        if self.volatile_tier.is_empty() {
            self.static_tier.clone()
        } else {
            format!("{}\n\n{}", self.static_tier, self.volatile_tier)
        }
    }

    pub fn to_anthropic_blocks(&self) -> Vec<serde_json::Value> {
        let mut blocks = vec![serde_json::json!({
            "type": "text",
            "text": self.static_tier,
            "cache_control": { "type": "ephemeral" }
        })];

        if !self.volatile_tier.is_empty() {
            blocks.push(serde_json::json!({
                "type": "text",
                "text": self.volatile_tier,
            }));
        }

        blocks
    }
}

const STATIC_PROMPT: &str = "\
You are Envoy, a conversational AI agent that can extend its own capabilities.

You have built-in tools for reading/writing files in your workspace and listing \
directories. Beyond those, you can create new tools for yourself at runtime with \
create_tool: give it a name, a description, a JSON Schema for its input, and a \
body of JavaScript async-function code with access to `input`, `http.fetch(url, \
options)`, and a read-only `env` object. You can group related tools behind a \
named integration with a declared credential schema via create_integration, and \
you can schedule yourself to run again later with schedule_task, which re-enters \
you under a fresh session with the task's description as your instruction.

When a tool fails, its error is reported back to you as text — you can retry, \
adjust your approach, or explain the problem to the user. Never invent a tool \
result; wait for it to come back from the tool call.";

/// Builds the static tier once; it never changes between turns.
pub fn static_tier() -> String {
    STATIC_PROMPT.to_string()
}

/// Rebuilds the volatile tier from the live catalog. Called at the start
/// of every turn so the model always sees an accurate picture of what it
/// has built for itself so far.
pub fn volatile_tier(store: &Store) -> envoy_store::Result<String> {
    let mut out = String::new();

    let tools = store.list_tools()?;
    let standalone: Vec<_> = tools.iter().filter(|t| t.integration_id.is_none()).collect();
    if !standalone.is_empty() {
        out.push_str("## Your custom tools\n\n");
        for tool in &standalone {
            let status = if tool.enabled { "enabled" } else { "disabled" };
            out.push_str(&format!(
                "- custom_{} ({status}): {}\n",
                tool.name, tool.description
            ));
        }
        out.push('\n');
    }

    let integrations = store.list_integrations()?;
    if !integrations.is_empty() {
        out.push_str("## Your integrations\n\n");
        for integration in &integrations {
            let configured = is_configured(&integration);
            let badge = match (integration.enabled, configured) {
                (false, _) => "disabled",
                (true, true) => "configured",
                (true, false) => "needs setup",
            };
            out.push_str(&format!(
                "- {} ({badge}): {}\n",
                integration.name, integration.description
            ));
            for tool in tools.iter().filter(|t| t.integration_id.as_deref() == Some(&integration.id)) {
                out.push_str(&format!(
                    "  - {}_{}: {}\n",
                    integration.name, tool.name, tool.description
                ));
            }
        }
        out.push('\n');
    }

    let tasks = store.list_tasks()?;
    if !tasks.is_empty() {
        out.push_str("## Your scheduled tasks\n\n");
        for task in &tasks {
            let status = if task.enabled { "enabled" } else { "disabled" };
            out.push_str(&format!(
                "- {} ({status}, cron `{}`): {}\n",
                task.name, task.cron, task.description
            ));
        }
    }

    Ok(out)
}

fn is_configured(integration: &Integration) -> bool {
    integration
        .config_schema
        .iter()
        .filter(|f| f.required)
        .all(|f| std::env::var(&f.key).map(|v| !v.is_empty()).unwrap_or(false))
}

pub fn build(store: &Store) -> envoy_store::Result<SystemPrompt> {
    Ok(SystemPrompt {
        static_tier: static_tier(),
        volatile_tier: volatile_tier(store)?,
    })
}

#[allow(dead_code)]
fn unused_task_ref(_t: &ScheduledTask) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volatile_tier_lists_standalone_tools() {
        let store = Store::open_in_memory().unwrap();
        store
            .create_tool(envoy_store::tool::NewTool {
                name: "get_weather",
                description: "fetches weather",
                input_schema: "{\"type\":\"object\"}",
                code: "return 1;",
                integration_id: None,
            })
            .unwrap();
        let tier = volatile_tier(&store).unwrap();
        assert!(tier.contains("custom_get_weather"));
        assert!(tier.contains("fetches weather"));
    }

    #[test]
    fn volatile_tier_is_empty_with_nothing_persisted() {
        let store = Store::open_in_memory().unwrap();
        let tier = volatile_tier(&store).unwrap();
        assert!(tier.is_empty());
    }

    #[test]
    fn to_anthropic_blocks_omits_empty_volatile_tier() {
        let prompt = SystemPrompt {
            static_tier: "hi".into(),
            volatile_tier: String::new(),
        };
        assert_eq!(prompt.to_anthropic_blocks().len(), 1);
    }
}
