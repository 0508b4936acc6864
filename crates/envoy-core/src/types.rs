use uuid::Uuid;

/// Opaque, time-sortable identifier used for sessions, tools, integrations,
/// scheduled tasks and task runs alike. UUIDv7 keeps ids sortable in logs
/// without a separate created_at lookup.
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// Identity of a conversation. A thin newtype so handlers and store calls
/// can't accidentally swap a session id for a tool or task id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(new_id())
    }

    pub fn synthetic_for_run(run_id: &str) -> Self {
        Self(format!("task-run-{run_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// `true` iff `name` is a valid identifier for a tool, integration, or
/// scheduled task: lowercase ASCII, starts with a letter, digits/underscore
/// after that.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_identifiers() {
        assert!(is_valid_identifier("get_weather"));
        assert!(is_valid_identifier("a"));
        assert!(is_valid_identifier("a1_2"));
    }

    #[test]
    fn rejects_bad_identifiers() {
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("1abc"));
        assert!(!is_valid_identifier("Abc"));
        assert!(!is_valid_identifier("has-dash"));
        assert!(!is_valid_identifier("has space"));
    }

    #[test]
    fn synthetic_session_for_run() {
        let id = SessionId::synthetic_for_run("abc123");
        assert_eq!(id.as_str(), "task-run-abc123");
    }
}
