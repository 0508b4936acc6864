use chrono::Utc;
use envoy_core::types::new_id;
use rusqlite::{params, Row};

use crate::error::{Result, StoreError};
use crate::types::{ConfigField, Integration};
use crate::Store;

fn row_to_integration(row: &Row) -> rusqlite::Result<Integration> {
    let schema_raw: String = row.get("config_schema")?;
    let config_schema: Vec<ConfigField> = serde_json::from_str(&schema_raw).unwrap_or_default();
    Ok(Integration {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        config_schema,
        enabled: row.get::<_, i64>("enabled")? != 0,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl Store {
    pub fn create_integration(
        &self,
        name: &str,
        description: &str,
        config_schema: &[ConfigField],
    ) -> Result<Integration> {
        let conn = self.conn.lock().unwrap();
        let exists: i64 = conn.query_row(
            "SELECT COUNT(*) FROM integrations WHERE name = ?1",
            params![name],
            |r| r.get(0),
        )?;
        if exists > 0 {
            return Err(StoreError::DuplicateName {
                kind: "integration",
                name: name.to_string(),
            });
        }
        let id = new_id();
        let now = Utc::now();
        let schema_json = serde_json::to_string(config_schema)?;
        conn.execute(
            "INSERT INTO integrations (id, name, description, config_schema, enabled, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)",
            params![id, name, description, schema_json, now],
        )?;
        Ok(Integration {
            id,
            name: name.to_string(),
            description: description.to_string(),
            config_schema: config_schema.to_vec(),
            enabled: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_integration(&self, name: &str) -> Result<Option<Integration>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, description, config_schema, enabled, created_at, updated_at
             FROM integrations WHERE name = ?1",
        )?;
        let mut rows = stmt.query(params![name])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_integration(row)?)),
            None => Ok(None),
        }
    }

    pub fn list_integrations(&self) -> Result<Vec<Integration>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, description, config_schema, enabled, created_at, updated_at
             FROM integrations ORDER BY name ASC",
        )?;
        let rows = stmt.query_map([], |row| row_to_integration(row))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }

    pub fn set_integration_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE integrations SET enabled = ?1, updated_at = ?2 WHERE name = ?3",
            params![enabled, Utc::now(), name],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound {
                kind: "integration",
                id: name.to_string(),
            });
        }
        Ok(())
    }

    pub fn delete_integration(&self, name: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute("DELETE FROM integrations WHERE name = ?1", params![name])?;
        if affected == 0 {
            return Err(StoreError::NotFound {
                kind: "integration",
                id: name.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Vec<ConfigField> {
        vec![ConfigField {
            key: "API_TOKEN".into(),
            label: "API token".into(),
            required: true,
        }]
    }

    #[test]
    fn create_then_get_preserves_schema() {
        let store = Store::open_in_memory().unwrap();
        store
            .create_integration("demo", "a demo integration", &schema())
            .unwrap();
        let got = store.get_integration("demo").unwrap().unwrap();
        assert_eq!(got.config_schema.len(), 1);
        assert_eq!(got.config_schema[0].key, "API_TOKEN");
    }

    #[test]
    fn delete_integration_cascades_tools() {
        let store = Store::open_in_memory().unwrap();
        let integration = store
            .create_integration("demo", "a demo integration", &schema())
            .unwrap();
        store
            .create_tool(crate::tool::NewTool {
                name: "demo_thing",
                description: "x",
                input_schema: "{\"type\":\"object\"}",
                code: "return 1;",
                integration_id: Some(&integration.id),
            })
            .unwrap();
        store.delete_integration("demo").unwrap();
        assert!(store.get_tool("demo_thing").unwrap().is_none());
    }

    #[test]
    fn duplicate_integration_name_rejected() {
        let store = Store::open_in_memory().unwrap();
        store.create_integration("demo", "d", &[]).unwrap();
        assert!(store.create_integration("demo", "d", &[]).is_err());
    }
}
