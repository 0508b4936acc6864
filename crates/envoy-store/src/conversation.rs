use chrono::Utc;
use rusqlite::params;

use crate::error::Result;
use crate::types::ConversationState;
use crate::Store;

impl Store {
    /// Returns the authoritative message list for a session, or an empty
    /// one if the session is unknown or the column is unparseable.
    pub fn get_conversation_state(&self, session_id: &str) -> Result<ConversationState> {
        let conn = self.conn.lock().unwrap();
        let raw: Option<String> = conn
            .query_row(
                "SELECT conversation_state FROM sessions WHERE id = ?1",
                params![session_id],
                |r| r.get(0),
            )
            .ok();

        Ok(raw
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default())
    }

    pub fn set_conversation_state(
        &self,
        session_id: &str,
        state: &ConversationState,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let raw = serde_json::to_string(state)?;
        conn.execute(
            "UPDATE sessions SET conversation_state = ?1, updated_at = ?2 WHERE id = ?3",
            params![raw, Utc::now(), session_id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AssistantPart, ConversationEntry};

    #[test]
    fn unknown_session_returns_empty_state() {
        let store = Store::open_in_memory().unwrap();
        let state = store.get_conversation_state("ghost").unwrap();
        assert!(state.entries.is_empty());
    }

    #[test]
    fn state_roundtrips_through_the_store() {
        let store = Store::open_in_memory().unwrap();
        store.get_or_create_session("s1").unwrap();
        let state = ConversationState {
            entries: vec![
                ConversationEntry::User {
                    content: "hi".into(),
                },
                ConversationEntry::Assistant {
                    parts: vec![AssistantPart::Text {
                        text: "hello".into(),
                    }],
                },
            ],
        };
        store.set_conversation_state("s1", &state).unwrap();
        let back = store.get_conversation_state("s1").unwrap();
        assert_eq!(back.entries.len(), 2);
    }
}
