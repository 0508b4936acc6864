use chrono::Utc;
use envoy_core::types::new_id;
use rusqlite::{params, Row};

use crate::error::{Result, StoreError};
use crate::types::CustomTool;
use crate::Store;

fn row_to_tool(row: &Row) -> rusqlite::Result<CustomTool> {
    Ok(CustomTool {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        input_schema: row.get("input_schema")?,
        code: row.get("code")?,
        enabled: row.get::<_, i64>("enabled")? != 0,
        integration_id: row.get("integration_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub struct NewTool<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub input_schema: &'a str,
    pub code: &'a str,
    pub integration_id: Option<&'a str>,
}

impl Store {
    pub fn create_tool(&self, new: NewTool<'_>) -> Result<CustomTool> {
        let conn = self.conn.lock().unwrap();
        let exists: i64 = conn.query_row(
            "SELECT COUNT(*) FROM custom_tools WHERE name = ?1",
            params![new.name],
            |r| r.get(0),
        )?;
        if exists > 0 {
            return Err(StoreError::DuplicateName {
                kind: "tool",
                name: new.name.to_string(),
            });
        }
        let id = new_id();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO custom_tools (id, name, description, input_schema, code, enabled, integration_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7, ?7)",
            params![id, new.name, new.description, new.input_schema, new.code, new.integration_id, now],
        )?;
        Ok(CustomTool {
            id,
            name: new.name.to_string(),
            description: new.description.to_string(),
            input_schema: new.input_schema.to_string(),
            code: new.code.to_string(),
            enabled: true,
            integration_id: new.integration_id.map(String::from),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_tool(&self, name: &str) -> Result<Option<CustomTool>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, description, input_schema, code, enabled, integration_id, created_at, updated_at
             FROM custom_tools WHERE name = ?1",
        )?;
        let mut rows = stmt.query(params![name])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_tool(row)?)),
            None => Ok(None),
        }
    }

    pub fn list_tools(&self) -> Result<Vec<CustomTool>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, description, input_schema, code, enabled, integration_id, created_at, updated_at
             FROM custom_tools ORDER BY name ASC",
        )?;
        let rows = stmt.query_map([], |row| row_to_tool(row))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }

    pub fn list_tools_for_integration(&self, integration_id: &str) -> Result<Vec<CustomTool>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, description, input_schema, code, enabled, integration_id, created_at, updated_at
             FROM custom_tools WHERE integration_id = ?1 ORDER BY name ASC",
        )?;
        let rows = stmt.query_map(params![integration_id], |row| row_to_tool(row))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }

    pub fn update_tool(&self, name: &str, update: ToolUpdate<'_>) -> Result<CustomTool> {
        let conn = self.conn.lock().unwrap();
        let existing = {
            let mut stmt = conn.prepare(
                "SELECT id, name, description, input_schema, code, enabled, integration_id, created_at, updated_at
                 FROM custom_tools WHERE name = ?1",
            )?;
            let mut rows = stmt.query(params![name])?;
            match rows.next()? {
                Some(row) => row_to_tool(row)?,
                None => {
                    return Err(StoreError::NotFound {
                        kind: "tool",
                        id: name.to_string(),
                    })
                }
            }
        };

        let description = update.description.unwrap_or(&existing.description);
        let input_schema = update.input_schema.unwrap_or(&existing.input_schema);
        let code = update.code.unwrap_or(&existing.code);
        let enabled = update.enabled.unwrap_or(existing.enabled);
        let now = Utc::now();

        conn.execute(
            "UPDATE custom_tools SET description = ?1, input_schema = ?2, code = ?3, enabled = ?4, updated_at = ?5 WHERE name = ?6",
            params![description, input_schema, code, enabled, now, name],
        )?;

        Ok(CustomTool {
            description: description.to_string(),
            input_schema: input_schema.to_string(),
            code: code.to_string(),
            enabled,
            updated_at: now,
            ..existing
        })
    }

    pub fn delete_tool(&self, name: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute("DELETE FROM custom_tools WHERE name = ?1", params![name])?;
        if affected == 0 {
            return Err(StoreError::NotFound {
                kind: "tool",
                id: name.to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct ToolUpdate<'a> {
    pub description: Option<&'a str>,
    pub input_schema: Option<&'a str>,
    pub code: Option<&'a str>,
    pub enabled: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_tool<'a>(name: &'a str) -> NewTool<'a> {
        NewTool {
            name,
            description: "does a thing",
            input_schema: "{\"type\":\"object\"}",
            code: "return 'ok';",
            integration_id: None,
        }
    }

    #[test]
    fn create_then_get() {
        let store = Store::open_in_memory().unwrap();
        store.create_tool(new_tool("do_thing")).unwrap();
        let tool = store.get_tool("do_thing").unwrap().unwrap();
        assert_eq!(tool.name, "do_thing");
        assert!(tool.enabled);
    }

    #[test]
    fn duplicate_name_rejected() {
        let store = Store::open_in_memory().unwrap();
        store.create_tool(new_tool("dup")).unwrap();
        let err = store.create_tool(new_tool("dup")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName { .. }));
    }

    #[test]
    fn update_partial_fields_only() {
        let store = Store::open_in_memory().unwrap();
        store.create_tool(new_tool("t")).unwrap();
        store
            .update_tool(
                "t",
                ToolUpdate {
                    enabled: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        let tool = store.get_tool("t").unwrap().unwrap();
        assert!(!tool.enabled);
        assert_eq!(tool.description, "does a thing");
    }

    #[test]
    fn create_then_delete_leaves_catalog_unchanged() {
        let store = Store::open_in_memory().unwrap();
        let before = store.list_tools().unwrap().len();
        store.create_tool(new_tool("temp")).unwrap();
        store.delete_tool("temp").unwrap();
        assert_eq!(store.list_tools().unwrap().len(), before);
    }

    #[test]
    fn delete_missing_tool_errors() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.delete_tool("nope").is_err());
    }
}
