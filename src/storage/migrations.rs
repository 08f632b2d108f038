//! Database migrations for devsync.
//!
//! Each migration upgrades the schema by one version. Migrations run
//! automatically when the database is opened.

use rusqlite::Connection;

use crate::error::DevsyncError;

/// Current schema version.
const CURRENT_VERSION: i32 = 1;

/// Get the current schema version from the database.
///
/// Returns 0 if no version has been set (new database).
pub fn get_version(conn: &Connection) -> Result<i32, DevsyncError> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| DevsyncError::Persistence(format!("Failed to get schema version: {e}")))
}

fn set_version(conn: &Connection, version: i32) -> Result<(), DevsyncError> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))
        .map_err(|e| DevsyncError::Persistence(format!("Failed to set schema version: {e}")))
}

/// Run all pending migrations.
pub fn run(conn: &Connection) -> Result<(), DevsyncError> {
    let current = get_version(conn)?;

    if current >= CURRENT_VERSION {
        return Ok(());
    }

    for version in (current + 1)..=CURRENT_VERSION {
        run_migration(conn, version)?;
        set_version(conn, version)?;
    }

    Ok(())
}

fn run_migration(conn: &Connection, version: i32) -> Result<(), DevsyncError> {
    match version {
        1 => migrate_v1(conn),
        _ => Err(DevsyncError::Persistence(format!(
            "Unknown migration version: {version}"
        ))),
    }
}

/// Migration v1: the ordered task list.
///
/// `position` is the insertion order and therefore the processing order.
fn migrate_v1(conn: &Connection) -> Result<(), DevsyncError> {
    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS sync_tasks (
            position INTEGER PRIMARY KEY,
            id TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            payload TEXT,
            status TEXT NOT NULL DEFAULT 'pending'
        );

        CREATE INDEX IF NOT EXISTS idx_sync_tasks_status
        ON sync_tasks(status);
        ",
    )
    .map_err(|e| DevsyncError::Persistence(format!("Migration v1 failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_v1() {
        let conn = Connection::open_in_memory().unwrap();

        run(&conn).unwrap();
        assert_eq!(get_version(&conn).unwrap(), CURRENT_VERSION);

        conn.execute(
            "INSERT INTO sync_tasks (position, id, created_at, payload)
             VALUES (0, 'abc', '2024-01-01T10:00:00Z', NULL)",
            [],
        )
        .unwrap();

        let status: String = conn
            .query_row("SELECT status FROM sync_tasks WHERE id = 'abc'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(status, "pending");
    }

    #[test]
    fn test_migration_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run(&conn).unwrap();
        run(&conn).unwrap();

        assert_eq!(get_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_get_version_new_database() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(get_version(&conn).unwrap(), 0);
    }
}
