//! Database schema and migrations

use rusqlite::Connection;

use crate::Result;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Initialize the database schema
///
/// # Errors
///
/// Returns error if migration fails
pub fn init(conn: &Connection) -> Result<()> {
    let version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        -- Tasks mirrored from the project tracker
        CREATE TABLE IF NOT EXISTS tasks (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            status TEXT NOT NULL CHECK(status IN ('pending', 'in_progress', 'completed', 'blocked')),
            priority TEXT NOT NULL CHECK(priority IN ('low', 'normal', 'high', 'critical')),
            deadline TEXT,
            assignee_name TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
        CREATE INDEX IF NOT EXISTS idx_tasks_assignee ON tasks(assignee_name);

        -- Per-person source control aggregates
        CREATE TABLE IF NOT EXISTS contributors (
            name TEXT PRIMARY KEY,
            total_commits INTEGER NOT NULL DEFAULT 0,
            total_lines_added INTEGER NOT NULL DEFAULT 0,
            total_lines_deleted INTEGER NOT NULL DEFAULT 0,
            total_lines_changed INTEGER NOT NULL DEFAULT 0,
            commits TEXT NOT NULL DEFAULT '[]'
        );

        PRAGMA user_version = 1;
        ",
    )?;

    tracing::info!("migrated to schema v1");
    Ok(())
}

fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        -- Per-person ticket lists from the issue tracker
        CREATE TABLE IF NOT EXISTS ticket_records (
            name TEXT PRIMARY KEY,
            tickets TEXT NOT NULL DEFAULT '[]'
        );

        PRAGMA user_version = 2;
        ",
    )?;

    tracing::info!("migrated to schema v2");
    Ok(())
}
