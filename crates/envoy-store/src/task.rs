use chrono::Utc;
use envoy_core::types::new_id;
use rusqlite::{params, Row};

use crate::error::{Result, StoreError};
use crate::types::{ScheduledTask, TaskRun, TaskRunStatus};
use crate::Store;

fn row_to_task(row: &Row) -> rusqlite::Result<ScheduledTask> {
    Ok(ScheduledTask {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        cron: row.get("cron")?,
        enabled: row.get::<_, i64>("enabled")? != 0,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn row_to_run(row: &Row) -> rusqlite::Result<TaskRun> {
    let status_str: String = row.get("status")?;
    let output_raw: Option<String> = row.get("output")?;
    Ok(TaskRun {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        status: status_str.parse().unwrap_or(TaskRunStatus::Error),
        result: row.get("result")?,
        output: output_raw.and_then(|s| serde_json::from_str(&s).ok()),
        started_at: row.get("started_at")?,
        finished_at: row.get("finished_at")?,
    })
}

impl Store {
    pub fn create_task(&self, name: &str, description: &str, cron: &str) -> Result<ScheduledTask> {
        let conn = self.conn.lock().unwrap();
        let exists: i64 = conn.query_row(
            "SELECT COUNT(*) FROM scheduled_tasks WHERE name = ?1",
            params![name],
            |r| r.get(0),
        )?;
        if exists > 0 {
            return Err(StoreError::DuplicateName {
                kind: "task",
                name: name.to_string(),
            });
        }
        let id = new_id();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO scheduled_tasks (id, name, description, cron, enabled, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)",
            params![id, name, description, cron, now],
        )?;
        Ok(ScheduledTask {
            id,
            name: name.to_string(),
            description: description.to_string(),
            cron: cron.to_string(),
            enabled: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_task(&self, name: &str) -> Result<Option<ScheduledTask>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, description, cron, enabled, created_at, updated_at
             FROM scheduled_tasks WHERE name = ?1",
        )?;
        let mut rows = stmt.query(params![name])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_task(row)?)),
            None => Ok(None),
        }
    }

    pub fn list_tasks(&self) -> Result<Vec<ScheduledTask>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, description, cron, enabled, created_at, updated_at
             FROM scheduled_tasks ORDER BY name ASC",
        )?;
        let rows = stmt.query_map([], |row| row_to_task(row))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }

    pub fn update_task(
        &self,
        name: &str,
        description: Option<&str>,
        cron: Option<&str>,
        enabled: Option<bool>,
    ) -> Result<ScheduledTask> {
        let conn = self.conn.lock().unwrap();
        let existing = {
            let mut stmt = conn.prepare(
                "SELECT id, name, description, cron, enabled, created_at, updated_at
                 FROM scheduled_tasks WHERE name = ?1",
            )?;
            let mut rows = stmt.query(params![name])?;
            match rows.next()? {
                Some(row) => row_to_task(row)?,
                None => {
                    return Err(StoreError::NotFound {
                        kind: "task",
                        id: name.to_string(),
                    })
                }
            }
        };
        let description = description.unwrap_or(&existing.description);
        let cron = cron.unwrap_or(&existing.cron);
        let enabled = enabled.unwrap_or(existing.enabled);
        let now = Utc::now();
        conn.execute(
            "UPDATE scheduled_tasks SET description = ?1, cron = ?2, enabled = ?3, updated_at = ?4 WHERE name = ?5",
            params![description, cron, enabled, now, name],
        )?;
        Ok(ScheduledTask {
            description: description.to_string(),
            cron: cron.to_string(),
            enabled,
            updated_at: now,
            ..existing
        })
    }

    pub fn delete_task(&self, name: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute("DELETE FROM scheduled_tasks WHERE name = ?1", params![name])?;
        if affected == 0 {
            return Err(StoreError::NotFound {
                kind: "task",
                id: name.to_string(),
            });
        }
        Ok(())
    }

    /// True iff this task has a run currently in progress. Checked by the
    /// scheduler before firing, to enforce "at most one running run".
    pub fn task_has_running_run(&self, task_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM task_runs WHERE task_id = ?1 AND status = 'running'",
            params![task_id],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn start_task_run(&self, task_id: &str) -> Result<TaskRun> {
        let conn = self.conn.lock().unwrap();
        let id = new_id();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO task_runs (id, task_id, status, started_at) VALUES (?1, ?2, 'running', ?3)",
            params![id, task_id, now],
        )?;
        Ok(TaskRun {
            id,
            task_id: task_id.to_string(),
            status: TaskRunStatus::Running,
            result: None,
            output: None,
            started_at: now,
            finished_at: None,
        })
    }

    pub fn finish_task_run(
        &self,
        run_id: &str,
        status: TaskRunStatus,
        result: &str,
        output: &serde_json::Value,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let output_json = serde_json::to_string(output)?;
        conn.execute(
            "UPDATE task_runs SET status = ?1, result = ?2, output = ?3, finished_at = ?4 WHERE id = ?5",
            params![status.to_string(), result, output_json, Utc::now(), run_id],
        )?;
        Ok(())
    }

    pub fn list_task_runs(&self, task_id: &str, limit: u32) -> Result<Vec<TaskRun>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, task_id, status, result, output, started_at, finished_at
             FROM task_runs WHERE task_id = ?1 ORDER BY started_at DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![task_id, limit], |row| row_to_run(row))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_most_one_running_run_is_observable() {
        let store = Store::open_in_memory().unwrap();
        let task = store.create_task("daily_digest", "send a digest", "0 9 * * *").unwrap();
        assert!(!store.task_has_running_run(&task.id).unwrap());
        let run = store.start_task_run(&task.id).unwrap();
        assert!(store.task_has_running_run(&task.id).unwrap());
        store
            .finish_task_run(&run.id, TaskRunStatus::Success, "done", &serde_json::json!([]))
            .unwrap();
        assert!(!store.task_has_running_run(&task.id).unwrap());
    }

    #[test]
    fn delete_task_cascades_runs() {
        let store = Store::open_in_memory().unwrap();
        let task = store.create_task("t", "d", "* * * * *").unwrap();
        store.start_task_run(&task.id).unwrap();
        store.delete_task("t").unwrap();
        assert_eq!(store.list_task_runs(&task.id, 10).unwrap().len(), 0);
    }

    #[test]
    fn update_task_reschedules_cron() {
        let store = Store::open_in_memory().unwrap();
        store.create_task("t", "d", "* * * * *").unwrap();
        let updated = store
            .update_task("t", None, Some("0 * * * *"), None)
            .unwrap();
        assert_eq!(updated.cron, "0 * * * *");
        assert_eq!(updated.description, "d");
    }
}
