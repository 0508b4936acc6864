use std::collections::HashMap;
use std::path::Path;

use envoy_store::{ConfigField, Integration, Store};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error(transparent)]
    Store(#[from] envoy_store::StoreError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IntegrationError>;

/// Owns credential persistence for integrations: a `KEY=VALUE` env file on
/// disk, kept in sync with the live process environment so the very next
/// tool invocation sees a freshly-saved value without a restart.
pub struct IntegrationManager {
    env_file: String,
}

impl IntegrationManager {
    pub fn new(env_file: impl Into<String>) -> Self {
        Self {
            env_file: env_file.into(),
        }
    }

    /// Filters `values` to the keys declared by `integration`'s
    /// config_schema, drops empty strings, persists the rest into the env
    /// file (preserving unrelated lines), and updates the live process
    /// environment immediately.
    pub fn save_config(
        &self,
        integration: &Integration,
        values: &HashMap<String, String>,
    ) -> Result<()> {
        let declared: std::collections::HashSet<&str> =
            integration.config_schema.iter().map(|f| f.key.as_str()).collect();

        let accepted: HashMap<&str, &str> = values
            .iter()
            .filter(|(k, v)| declared.contains(k.as_str()) && !v.is_empty())
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        if accepted.is_empty() {
            return Ok(());
        }

        let mut lines = self.read_lines()?;
        for (key, value) in &accepted {
            upsert_line(&mut lines, key, value);
            std::env::set_var(key, value);
        }
        self.write_lines(&lines)?;

        Ok(())
    }

    /// `None` if unset, `***` if short, `first3***last3` otherwise.
    pub fn masked_values(&self, schema: &[ConfigField]) -> HashMap<String, Option<String>> {
        schema
            .iter()
            .map(|field| {
                let masked = std::env::var(&field.key).ok().map(|v| mask(&v));
                (field.key.clone(), masked)
            })
            .collect()
    }

    /// True iff every required key resolves to a non-empty environment
    /// value.
    pub fn is_configured(&self, schema: &[ConfigField]) -> bool {
        schema
            .iter()
            .filter(|f| f.required)
            .all(|f| std::env::var(&f.key).map(|v| !v.is_empty()).unwrap_or(false))
    }

    fn read_lines(&self) -> Result<Vec<String>> {
        if !Path::new(&self.env_file).exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.env_file)?;
        Ok(content.lines().map(String::from).collect())
    }

    fn write_lines(&self, lines: &[String]) -> Result<()> {
        if let Some(parent) = Path::new(&self.env_file).parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.env_file, format!("{}\n", lines.join("\n")))?;
        Ok(())
    }

    /// Loads every `KEY=VALUE` line from the env file into the live
    /// process environment. Called once at startup so integrations
    /// configured in a previous run are available immediately.
    pub fn load_into_process_env(&self) -> Result<()> {
        for line in self.read_lines()? {
            if let Some((key, value)) = line.split_once('=') {
                if std::env::var(key).is_err() {
                    std::env::set_var(key, value);
                }
            }
        }
        Ok(())
    }
}

fn upsert_line(lines: &mut Vec<String>, key: &str, value: &str) {
    let prefix = format!("{key}=");
    for line in lines.iter_mut() {
        if line.starts_with(&prefix) {
            *line = format!("{key}={value}");
            return;
        }
    }
    lines.push(format!("{key}={value}"));
}

fn mask(value: &str) -> String {
    if value.len() <= 8 {
        "***".to_string()
    } else {
        let first: String = value.chars().take(3).collect();
        let last: String = value.chars().rev().take(3).collect::<String>().chars().rev().collect();
        format!("{first}***{last}")
    }
}

/// True iff every key in `schema` is non-empty in the live environment,
/// used by `envoy_store::Store` callers who already have the schema
/// without going through the manager.
pub fn configured_from_env(schema: &[ConfigField]) -> bool {
    schema
        .iter()
        .filter(|f| f.required)
        .all(|f| std::env::var(&f.key).map(|v| !v.is_empty()).unwrap_or(false))
}

#[allow(dead_code)]
fn touch(_store: &Store) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_short_value_is_fully_masked() {
        assert_eq!(mask("abc"), "***");
    }

    #[test]
    fn mask_long_value_keeps_edges() {
        assert_eq!(mask("abcdefghij"), "abc***hij");
    }

    #[test]
    fn save_config_filters_undeclared_keys() {
        let dir = std::env::temp_dir().join(format!("envoy-test-{}", envoy_core::types::new_id()));
        let env_file = dir.join("env").to_string_lossy().into_owned();
        let manager = IntegrationManager::new(&env_file);

        let integration = Integration {
            id: "i1".into(),
            name: "demo".into(),
            description: "".into(),
            config_schema: vec![ConfigField {
                key: "DEMO_TOKEN".into(),
                label: "Token".into(),
                required: true,
            }],
            enabled: true,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        let mut values = HashMap::new();
        values.insert("DEMO_TOKEN".to_string(), "secret-value".to_string());
        values.insert("UNRELATED".to_string(), "nope".to_string());

        manager.save_config(&integration, &values).unwrap();

        assert_eq!(std::env::var("DEMO_TOKEN").unwrap(), "secret-value");
        assert!(std::env::var("UNRELATED").is_err());
        assert!(manager.is_configured(&integration.config_schema));

        std::fs::remove_dir_all(&dir).ok();
        std::env::remove_var("DEMO_TOKEN");
    }
}
