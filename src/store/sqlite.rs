use super::PersistenceAdapter;
use crate::engine::types::ListKind;
use crate::error::{PersistenceError, PersistenceResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::info;

/// SQLite-backed key-value store: one row per named collection.
pub struct SqliteStore {
    db_path: String,
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(db_path: impl Into<String>) -> PersistenceResult<Self> {
        let db_path = db_path.into();
        let conn = Connection::open(&db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self {
            db_path,
            conn: Mutex::new(conn),
        })
    }

    pub fn path(&self) -> &str {
        &self.db_path
    }
}

impl PersistenceAdapter for SqliteStore {
    fn initialize(&self) -> PersistenceResult<()> {
        let conn = self.conn.lock().map_err(|_| PersistenceError::Poisoned)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        // Seed empty rule lists so operators always find both collections.
        for kind in [ListKind::Allow, ListKind::Deny] {
            conn.execute(
                "INSERT OR IGNORE INTO collections (name, value, updated_at) VALUES (?1, '[]', ?2)",
                params![kind.collection(), unix_secs()],
            )?;
        }

        info!("SQLite collections ready");
        Ok(())
    }

    fn get(&self, collection: &str) -> PersistenceResult<Option<Value>> {
        let conn = self.conn.lock().map_err(|_| PersistenceError::Poisoned)?;
        let raw: Option<String> = conn
            .prepare_cached("SELECT value FROM collections WHERE name = ?1")?
            .query_row(params![collection], |row| row.get(0))
            .optional()?;

        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    fn set(&self, collection: &str, value: Value) -> PersistenceResult<()> {
        let text = serde_json::to_string(&value)?;
        let conn = self.conn.lock().map_err(|_| PersistenceError::Poisoned)?;
        conn.prepare_cached(
            "INSERT INTO collections (name, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )?
        .execute(params![collection, text, unix_secs()])?;
        Ok(())
    }
}

fn unix_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
