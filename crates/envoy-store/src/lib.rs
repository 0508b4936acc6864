pub mod conversation;
pub mod db;
pub mod error;
pub mod integration;
pub mod session;
pub mod task;
pub mod tool;
pub mod types;

pub use error::{Result, StoreError};
pub use types::*;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

/// Single-writer store: every table lives behind one guarded connection.
/// Methods are split across files by entity (session.rs, tool.rs, ...) but
/// all operate on this one type.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")?;
        db::init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// An ephemeral, non-persistent store backed by SQLite's `:memory:`
    /// mode. Used by this crate's own tests and by dependent crates that
    /// need a real `Store` in their own tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        db::init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}
