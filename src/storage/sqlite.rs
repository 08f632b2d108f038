//! `SQLite` queue store.
//!
//! The database lives at `~/.devsync/devsync.db`. The task list is one
//! table ordered by `position`, rewritten inside a single transaction on
//! every save.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::migrations;
use super::store::QueueStore;
use crate::error::DevsyncError;
use crate::sync::{SyncTask, TaskStatus};

/// Queue store keeping the task list in the `sync_tasks` table.
pub struct SqliteQueueStore {
    conn: Connection,
    label: String,
}

impl SqliteQueueStore {
    /// Open (or create) the store at a path, creating parent directories
    /// and running migrations as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self, DevsyncError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DevsyncError::Persistence(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let conn = Connection::open(path).map_err(|e| {
            DevsyncError::Persistence(format!("Failed to open database {}: {e}", path.display()))
        })?;
        migrations::run(&conn)?;

        Ok(Self {
            conn,
            label: path.display().to_string(),
        })
    }

    /// Open a throwaway in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_in_memory() -> Result<Self, DevsyncError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            DevsyncError::Persistence(format!("Failed to open in-memory database: {e}"))
        })?;
        migrations::run(&conn)?;

        Ok(Self {
            conn,
            label: "sqlite::memory".to_string(),
        })
    }

    /// Current schema version.
    ///
    /// # Errors
    ///
    /// Returns an error if the version cannot be read.
    pub fn schema_version(&self) -> Result<i32, DevsyncError> {
        migrations::get_version(&self.conn)
    }
}

struct TaskRow {
    id: String,
    created_at: String,
    payload: Option<String>,
    status: String,
}

impl TaskRow {
    fn into_task(self) -> Result<SyncTask, DevsyncError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| corrupt(format!("bad task id '{}': {e}", self.id)))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| corrupt(format!("bad timestamp '{}': {e}", self.created_at)))?;
        let payload = self
            .payload
            .map(|p| serde_json::from_str(&p))
            .transpose()
            .map_err(|e| corrupt(format!("bad payload for {id}: {e}")))?;
        let status = self.status.parse::<TaskStatus>().map_err(corrupt)?;

        Ok(SyncTask::restore(id, created_at, payload, status))
    }
}

fn corrupt(msg: String) -> DevsyncError {
    DevsyncError::Persistence(format!("corrupt queue row: {msg}"))
}

impl QueueStore for SqliteQueueStore {
    fn load(&self) -> Result<Vec<SyncTask>, DevsyncError> {
        let mut stmt = self
            .conn
            .prepare(
                r"SELECT id, created_at, payload, status
                  FROM sync_tasks
                  ORDER BY position ASC",
            )
            .map_err(|e| DevsyncError::Persistence(format!("Failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(TaskRow {
                    id: row.get(0)?,
                    created_at: row.get(1)?,
                    payload: row.get(2)?,
                    status: row.get(3)?,
                })
            })
            .map_err(|e| DevsyncError::Persistence(format!("Failed to query tasks: {e}")))?;

        let mut tasks = Vec::new();
        for row in rows {
            let row = row.map_err(|e| DevsyncError::Persistence(e.to_string()))?;
            tasks.push(row.into_task()?);
        }

        Ok(tasks)
    }

    fn save(&mut self, tasks: &[SyncTask]) -> Result<(), DevsyncError> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| DevsyncError::Persistence(format!("Failed to begin transaction: {e}")))?;

        tx.execute("DELETE FROM sync_tasks", [])
            .map_err(|e| DevsyncError::Persistence(format!("Failed to clear tasks: {e}")))?;

        {
            let mut stmt = tx
                .prepare(
                    r"INSERT INTO sync_tasks (position, id, created_at, payload, status)
                      VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(|e| DevsyncError::Persistence(format!("Failed to prepare insert: {e}")))?;

            for (position, task) in tasks.iter().enumerate() {
                let payload = task
                    .payload()
                    .map(serde_json::to_string)
                    .transpose()
                    .map_err(|e| {
                        DevsyncError::Persistence(format!(
                            "Failed to encode payload of {}: {e}",
                            task.id()
                        ))
                    })?;
                stmt.execute(params![
                    i64::try_from(position).unwrap_or(i64::MAX),
                    task.id().to_string(),
                    task.created_at().to_rfc3339_opts(SecondsFormat::Micros, true),
                    payload,
                    task.status().as_str(),
                ])
                .map_err(|e| {
                    DevsyncError::Persistence(format!("Failed to save task {}: {e}", task.id()))
                })?;
            }
        }

        tx.commit()
            .map_err(|e| DevsyncError::Persistence(format!("Failed to commit tasks: {e}")))
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_store() -> SqliteQueueStore {
        SqliteQueueStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_empty_store_loads_nothing() {
        let store = create_test_store();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load_preserves_order() {
        let mut store = create_test_store();
        let now = Utc::now();

        let mut done = SyncTask::new(Some(json!({"op": "b"})), now);
        done.set_status(TaskStatus::Completed);
        let tasks = vec![
            SyncTask::new(Some(json!({"op": "a"})), now),
            done,
            SyncTask::new(None, now),
        ];

        store.save(&tasks).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded.len(), 3);
        for (saved, read) in tasks.iter().zip(&loaded) {
            assert_eq!(saved.id(), read.id());
            assert_eq!(saved.status(), read.status());
            assert_eq!(saved.payload(), read.payload());
        }
    }

    #[test]
    fn test_save_replaces_previous_list() {
        let mut store = create_test_store();
        let now = Utc::now();

        store
            .save(&[SyncTask::new(None, now), SyncTask::new(None, now)])
            .unwrap();
        store.save(&[SyncTask::new(None, now)]).unwrap();

        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_status_is_persistence_error() {
        let store = create_test_store();
        store
            .conn
            .execute(
                "INSERT INTO sync_tasks (position, id, created_at, status)
                 VALUES (0, ?1, '2024-01-01T10:00:00Z', 'exploded')",
                [Uuid::new_v4().to_string()],
            )
            .unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, DevsyncError::Persistence(_)));
    }

    #[test]
    fn test_open_under_file_is_persistence_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let blocker = temp_dir.path().join("data");
        std::fs::write(&blocker, "not a directory").unwrap();

        let err = SqliteQueueStore::open(&blocker.join("nested").join("queue.db"))
            .err()
            .unwrap();
        assert!(matches!(err, DevsyncError::Persistence(_)));
    }

    #[test]
    fn test_null_payload_row_loads_as_heartbeat() {
        let store = create_test_store();
        store
            .conn
            .execute(
                "INSERT INTO sync_tasks (position, id, created_at, payload, status)
                 VALUES (0, ?1, '2024-01-01T10:00:00Z', 'null', 'pending')",
                [Uuid::new_v4().to_string()],
            )
            .unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].payload().is_none());
    }

    #[test]
    fn test_reopen_from_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("queue.db");
        let task = SyncTask::new(Some(json!({"n": 1})), Utc::now());

        {
            let mut store = SqliteQueueStore::open(&path).unwrap();
            assert_eq!(store.schema_version().unwrap(), 1);
            store.save(std::slice::from_ref(&task)).unwrap();
        }

        // Reopening must not rerun migrations over existing rows.
        let store = SqliteQueueStore::open(&path).unwrap();
        assert_eq!(store.schema_version().unwrap(), 1);
        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id(), task.id());
    }
}
