use std::collections::HashMap;
use std::sync::Arc;

use envoy_bus::event::{ToolCallEvent, ToolResultEvent};
use envoy_bus::{Event, EventBus};
use envoy_catalog::Tool;
use envoy_core::config::MAX_STEPS;
use envoy_store::{AssistantPart, ConversationEntry, Role, Store, ToolResultPart};
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::Result;
use crate::prompt;
use crate::provider::{ChatRequest, ToolCall, ToolDefinition};
use crate::runtime::AgentRuntime;
use crate::stream::StreamEvent;

/// Drives one full turn of the agent loop for `session_id`: appends the
/// user's message, streams the model's reply, executes any requested tools,
/// splices their results back into history, and repeats until the model
/// stops asking for tools or [`MAX_STEPS`] is reached. Emits the full
/// `Start` -> (`Delta` | `ToolCalls` | `ToolResults`)* -> `Done` sequence on
/// the event bus as it goes, and persists the resulting conversation state
/// before returning.
pub async fn run_turn(
    store: Arc<Store>,
    bus: &EventBus,
    runtime: &AgentRuntime,
    fs_root: &str,
    session_id: &str,
    user_message: &str,
) -> Result<String> {
    store.get_or_create_session(session_id)?;
    let mut state = store.get_conversation_state(session_id)?;
    state.entries.push(ConversationEntry::User {
        content: user_message.to_string(),
    });
    store.append_message(session_id, Role::User, user_message)?;
    store.maybe_set_title_from_first_message(session_id, user_message)?;

    bus.emit(session_id, Event::Start);

    let model = runtime.get_model().await;
    let mut final_text = String::new();

    for step in 0..MAX_STEPS {
        let system_prompt = prompt::build(&store)?;
        let tools = envoy_catalog::build_tools(store.clone(), fs_root, runtime.env_file())?;
        let tool_defs = to_provider_tool_defs(&tools);

        let req = ChatRequest {
            model: model.clone(),
            system: system_prompt.to_plain_text(),
            system_prompt: Some(system_prompt),
            messages: Vec::new(),
            max_tokens: 4096,
            stream: true,
            thinking: None,
            tools: tool_defs,
            raw_messages: Some(to_raw_messages(&state.entries)),
        };

        let (tx, mut rx) = mpsc::channel::<StreamEvent>(256);
        let provider_call = runtime.provider().send_stream(&req, tx);

        let mut text = String::new();
        let mut calls: Vec<ToolCall> = Vec::new();
        let mut stream_error: Option<String> = None;

        let drain = async {
            while let Some(event) = rx.recv().await {
                match event {
                    StreamEvent::TextDelta { text: delta } => {
                        bus.emit(
                            session_id,
                            Event::Delta {
                                content: delta.clone(),
                            },
                        );
                        text.push_str(&delta);
                    }
                    StreamEvent::Thinking { .. } => {}
                    StreamEvent::ToolUse { id, name, input } => {
                        calls.push(ToolCall { id, name, input });
                    }
                    StreamEvent::Done { .. } => {}
                    StreamEvent::Error { message } => {
                        stream_error = Some(message);
                    }
                }
            }
        };

        let (send_result, _) = tokio::join!(provider_call, drain);
        send_result?;

        if let Some(message) = stream_error {
            warn!(session_id, step, %message, "agent loop: stream error");
            bus.emit(
                session_id,
                Event::Done {
                    content: message.clone(),
                },
            );
            final_text = message;
            break;
        }

        let mut parts = Vec::new();
        if !text.is_empty() {
            parts.push(AssistantPart::Text { text: text.clone() });
        }
        for call in &calls {
            parts.push(AssistantPart::ToolCall {
                tool_call_id: call.id.clone(),
                name: call.name.clone(),
                args: call.input.clone(),
            });
        }
        state.entries.push(ConversationEntry::Assistant { parts });

        if calls.is_empty() {
            final_text = text;
            bus.emit(
                session_id,
                Event::Done {
                    content: final_text.clone(),
                },
            );
            store.append_message(session_id, Role::Assistant, &final_text)?;
            break;
        }

        bus.emit(
            session_id,
            Event::ToolCalls {
                calls: calls
                    .iter()
                    .map(|c| ToolCallEvent {
                        tool_call_id: c.id.clone(),
                        name: c.name.clone(),
                        args: c.input.clone(),
                    })
                    .collect(),
            },
        );

        if !text.is_empty() {
            store.append_message(session_id, Role::Assistant, &text)?;
        }

        let by_name: HashMap<String, &Box<dyn Tool>> =
            tools.iter().map(|t| (t.name(), t)).collect();

        let mut results = Vec::with_capacity(calls.len());
        for call in &calls {
            let result = match by_name.get(&call.name) {
                Some(tool) => tool.execute(call.input.clone()).await,
                None => envoy_catalog::ToolResult::error(format!(
                    "unknown tool: {}",
                    call.name
                )),
            };
            store.append_message(
                session_id,
                Role::Tool,
                &format!("{}: {}", call.name, result.content),
            )?;
            results.push(ToolResultPart {
                tool_call_id: call.id.clone(),
                name: call.name.clone(),
                result: result.content,
            });
        }

        bus.emit(
            session_id,
            Event::ToolResults {
                results: results
                    .iter()
                    .map(|r| ToolResultEvent {
                        tool_call_id: r.tool_call_id.clone(),
                        name: r.name.clone(),
                        result: r.result.clone(),
                    })
                    .collect(),
            },
        );

        state.entries.push(ConversationEntry::Tool { results });

        if step + 1 == MAX_STEPS {
            final_text =
                "Reached the maximum number of steps for this turn without a final answer."
                    .to_string();
            bus.emit(
                session_id,
                Event::Done {
                    content: final_text.clone(),
                },
            );
            store.append_message(session_id, Role::System, &final_text)?;
        }
    }

    store.set_conversation_state(session_id, &state)?;
    Ok(final_text)
}

fn to_provider_tool_defs(tools: &[Box<dyn Tool>]) -> Vec<ToolDefinition> {
    envoy_catalog::to_definitions(tools)
        .into_iter()
        .map(|d| ToolDefinition {
            name: d.name,
            description: d.description,
            input_schema: d.input_schema,
        })
        .collect()
}

/// Projects the authoritative [`ConversationState`] into the raw Anthropic
/// message blocks the provider sends over the wire, including tool_use and
/// tool_result content blocks that a plain string history can't represent.
fn to_raw_messages(entries: &[ConversationEntry]) -> Vec<serde_json::Value> {
    entries
        .iter()
        .map(|entry| match entry {
            ConversationEntry::User { content } => serde_json::json!({
                "role": "user",
                "content": content,
            }),
            ConversationEntry::Assistant { parts } => {
                let blocks: Vec<serde_json::Value> = parts
                    .iter()
                    .map(|part| match part {
                        AssistantPart::Text { text } => serde_json::json!({
                            "type": "text",
                            "text": text,
                        }),
                        AssistantPart::ToolCall {
                            tool_call_id,
                            name,
                            args,
                        } => serde_json::json!({
                            "type": "tool_use",
                            "id": tool_call_id,
                            "name": name,
                            "input": args,
                        }),
                    })
                    .collect();
                serde_json::json!({ "role": "assistant", "content": blocks })
            }
            ConversationEntry::Tool { results } => {
                let blocks: Vec<serde_json::Value> = results
                    .iter()
                    .map(|r| {
                        serde_json::json!({
                            "type": "tool_result",
                            "tool_use_id": r.tool_call_id,
                            "content": r.result,
                        })
                    })
                    .collect();
                serde_json::json!({ "role": "user", "content": blocks })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_messages_round_trip_tool_call_shape() {
        let entries = vec![
            ConversationEntry::User {
                content: "hi".into(),
            },
            ConversationEntry::Assistant {
                parts: vec![AssistantPart::ToolCall {
                    tool_call_id: "call_1".into(),
                    name: "get_weather".into(),
                    args: serde_json::json!({"city": "nyc"}),
                }],
            },
            ConversationEntry::Tool {
                results: vec![ToolResultPart {
                    tool_call_id: "call_1".into(),
                    name: "get_weather".into(),
                    result: "sunny".into(),
                }],
            },
        ];

        let raw = to_raw_messages(&entries);
        assert_eq!(raw.len(), 3);
        assert_eq!(raw[1]["role"], "assistant");
        assert_eq!(raw[1]["content"][0]["type"], "tool_use");
        assert_eq!(raw[2]["role"], "user");
        assert_eq!(raw[2]["content"][0]["type"], "tool_result");
    }
}
