use chrono::Utc;
use envoy_core::types::new_id;
use rusqlite::{params, Row};

use crate::error::{Result, StoreError};
use crate::types::{Message, Role, Session};
use crate::Store;

const TITLE_MAX_CHARS: usize = 40;

fn row_to_session(row: &Row) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get("id")?,
        title: row.get("title")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl Store {
    /// Look up a session, creating it if it doesn't exist yet.
    pub fn get_or_create_session(&self, id: &str) -> Result<Session> {
        if let Some(session) = self.get_session(id)? {
            return Ok(session);
        }
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO sessions (id, title, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![id, "New chat", now],
        )?;
        Ok(Session {
            id: id.to_string(),
            title: "New chat".to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_session(&self, id: &str) -> Result<Option<Session>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, title, created_at, updated_at FROM sessions WHERE id = ?1",
        )?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_session(row)?)),
            None => Ok(None),
        }
    }

    pub fn list_sessions(&self) -> Result<Vec<Session>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, title, created_at, updated_at FROM sessions ORDER BY updated_at DESC",
        )?;
        let rows = stmt.query_map([], |row| row_to_session(row))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }

    pub fn delete_session(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(StoreError::NotFound {
                kind: "session",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Sets the session title from the first user message if it hasn't
    /// been customized yet (still "New chat"), truncating with ellipsis.
    pub fn maybe_set_title_from_first_message(&self, id: &str, content: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let current: String = conn.query_row(
            "SELECT title FROM sessions WHERE id = ?1",
            params![id],
            |r| r.get(0),
        )?;
        if current != "New chat" {
            return Ok(());
        }
        let title = truncate_title(content);
        conn.execute(
            "UPDATE sessions SET title = ?1, updated_at = ?2 WHERE id = ?3",
            params![title, Utc::now(), id],
        )?;
        Ok(())
    }

    pub fn touch_session(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE sessions SET updated_at = ?1 WHERE id = ?2",
            params![Utc::now(), id],
        )?;
        Ok(())
    }

    /// Appends a transcript row. This is the human-readable log, separate
    /// from the authoritative conversation state used for model replay.
    pub fn append_message(&self, session_id: &str, role: Role, content: &str) -> Result<Message> {
        let conn = self.conn.lock().unwrap();
        let id = new_id();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO messages (id, session_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, session_id, role.to_string(), content, now],
        )?;
        Ok(Message {
            id,
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            created_at: now,
        })
    }

    pub fn list_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, session_id, role, content, created_at FROM messages
             WHERE session_id = ?1 ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map(params![session_id], |row| {
            let role_str: String = row.get("role")?;
            Ok(Message {
                id: row.get("id")?,
                session_id: row.get("session_id")?,
                role: role_str.parse().unwrap_or(Role::User),
                content: row.get("content")?,
                created_at: row.get("created_at")?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }
}

fn truncate_title(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.chars().count() <= TITLE_MAX_CHARS {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let a = store.get_or_create_session("s1").unwrap();
        let b = store.get_or_create_session("s1").unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.created_at, b.created_at);
    }

    #[test]
    fn title_set_once_from_first_message() {
        let store = Store::open_in_memory().unwrap();
        store.get_or_create_session("s1").unwrap();
        store
            .maybe_set_title_from_first_message("s1", "what is the weather in nyc today?")
            .unwrap();
        let session = store.get_session("s1").unwrap().unwrap();
        assert_eq!(session.title, "what is the weather in nyc today?");

        store
            .maybe_set_title_from_first_message("s1", "a second message")
            .unwrap();
        let session = store.get_session("s1").unwrap().unwrap();
        assert_eq!(session.title, "what is the weather in nyc today?");
    }

    #[test]
    fn title_truncates_long_first_message() {
        let store = Store::open_in_memory().unwrap();
        store.get_or_create_session("s1").unwrap();
        let long = "a".repeat(80);
        store
            .maybe_set_title_from_first_message("s1", &long)
            .unwrap();
        let session = store.get_session("s1").unwrap().unwrap();
        assert_eq!(session.title.chars().count(), TITLE_MAX_CHARS + 3);
        assert!(session.title.ends_with("..."));
    }

    #[test]
    fn delete_session_cascades_messages() {
        let store = Store::open_in_memory().unwrap();
        store.get_or_create_session("s1").unwrap();
        store.append_message("s1", Role::User, "hi").unwrap();
        store.delete_session("s1").unwrap();
        assert!(store.get_session("s1").unwrap().is_none());
        assert_eq!(store.list_messages("s1").unwrap().len(), 0);
    }

    #[test]
    fn delete_missing_session_errors() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.delete_session("nope").is_err());
    }
}
