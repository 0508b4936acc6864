use serde_json::Value;
use tracing::warn;

/// Parses a stored `input_schema` string as JSON Schema. A schema that
/// isn't an object, or is missing `type`, is salvaged into a bare
/// `{"type":"object"}` with a warning rather than dropping the tool —
/// only an outright parse failure returns `None`.
pub fn normalize(name: &str, raw: &str) -> Option<Value> {
    let mut value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(err) => {
            warn!(tool = name, %err, "tool input_schema failed to parse, dropping tool");
            return None;
        }
    };

    if !value.is_object() {
        warn!(tool = name, "tool input_schema root is not an object, normalizing");
        return Some(serde_json::json!({"type": "object"}));
    }

    if value.get("type").is_none() {
        warn!(tool = name, "tool input_schema missing 'type', defaulting to object");
        value
            .as_object_mut()
            .unwrap()
            .insert("type".to_string(), Value::String("object".to_string()));
    }

    Some(value)
}

/// Stricter check used when a tool is first created or updated: unlike
/// [`normalize`], an array (or other non-object) root is rejected outright
/// rather than salvaged, so the model gets immediate feedback instead of a
/// silently-replaced schema.
pub fn validate_new(raw: &str) -> Result<(), String> {
    let value: Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    if !value.is_object() {
        return Err("input_schema must be a JSON object, not an array or scalar".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_schema_passes_through() {
        let v = normalize("t", r#"{"type":"object","properties":{}}"#).unwrap();
        assert_eq!(v["type"], "object");
    }

    #[test]
    fn missing_type_is_defaulted() {
        let v = normalize("t", r#"{"properties":{}}"#).unwrap();
        assert_eq!(v["type"], "object");
    }

    #[test]
    fn non_object_root_is_normalized() {
        let v = normalize("t", r#"["a","b"]"#).unwrap();
        assert_eq!(v["type"], "object");
    }

    #[test]
    fn unparseable_schema_returns_none() {
        assert!(normalize("t", "not json at all {{{").is_none());
    }

    #[test]
    fn validate_new_accepts_an_object_root() {
        assert!(validate_new(r#"{"type":"object"}"#).is_ok());
    }

    #[test]
    fn validate_new_rejects_an_array_root() {
        assert!(validate_new(r#"["a","b"]"#).is_err());
    }

    #[test]
    fn validate_new_rejects_unparseable_json() {
        assert!(validate_new("not json at all {{{").is_err());
    }
}
