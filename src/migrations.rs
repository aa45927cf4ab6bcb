//! Database migrations.

use rusqlite::{Connection, Result as SqliteResult};
use tracing::{info, warn};

/// Latest migration version.
const MIGRATION_VERSION: i64 = 2;

/// Initialize the migration system.
pub fn initialize_migrations(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )
        "#,
        [],
    )?;

    Ok(())
}

/// Current database version.
fn get_current_version(conn: &Connection) -> SqliteResult<i64> {
    let version: SqliteResult<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        });

    match version {
        Ok(v) => Ok(v),
        Err(_) => Ok(0), // empty table
    }
}

/// Record an applied migration.
fn record_migration(conn: &Connection, version: i64) -> SqliteResult<()> {
    let current_time_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);

    conn.execute(
        "INSERT OR REPLACE INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
        [version, current_time_ms],
    )?;

    Ok(())
}

/// Check whether a table exists.
fn table_exists(conn: &Connection, table: &str) -> SqliteResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Check whether a column exists.
fn column_exists(conn: &Connection, table: &str, column: &str) -> SqliteResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let columns = stmt.query_map([], |row| {
        let col_name: String = row.get(1)?;
        Ok(col_name)
    })?;

    for col_name in columns.flatten() {
        if col_name == column {
            return Ok(true);
        }
    }

    Ok(false)
}

/// Migration 1: add latency and metadata fields to messages.
fn migration_001_add_message_diagnostics(conn: &Connection) -> SqliteResult<()> {
    info!("Running migration 001: add message diagnostic fields");

    // A fresh database gets the full schema; nothing to patch.
    if !table_exists(conn, "messages")? {
        return Ok(());
    }

    if !column_exists(conn, "messages", "response_time_ms")? {
        conn.execute("ALTER TABLE messages ADD COLUMN response_time_ms INTEGER", [])?;
    }

    if !column_exists(conn, "messages", "metadata")? {
        conn.execute("ALTER TABLE messages ADD COLUMN metadata TEXT", [])?;
    }

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_messages_session_role ON messages(session_id, role)",
        [],
    )?;

    Ok(())
}

/// Migration 2: add denormalized aggregate fields to sessions.
fn migration_002_add_session_aggregates(conn: &Connection) -> SqliteResult<()> {
    info!("Running migration 002: add session aggregate fields");

    if !table_exists(conn, "sessions")? {
        return Ok(());
    }

    if !column_exists(conn, "sessions", "total_tokens_used")? {
        conn.execute(
            "ALTER TABLE sessions ADD COLUMN total_tokens_used INTEGER NOT NULL DEFAULT 0",
            [],
        )?;
    }

    if !column_exists(conn, "sessions", "last_message_preview")? {
        conn.execute("ALTER TABLE sessions ADD COLUMN last_message_preview TEXT", [])?;
    }

    Ok(())
}

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> SqliteResult<()> {
    initialize_migrations(conn)?;

    let current_version = get_current_version(conn)?;

    if current_version >= MIGRATION_VERSION {
        return Ok(());
    }

    // One transaction for atomicity
    let tx = conn.unchecked_transaction()?;

    if current_version < 1 {
        match migration_001_add_message_diagnostics(&tx) {
            Ok(_) => record_migration(&tx, 1)?,
            Err(e) => {
                warn!("Migration 1 failed: {}", e);
                return Err(e);
            }
        }
    }

    if current_version < 2 {
        match migration_002_add_session_aggregates(&tx) {
            Ok(_) => record_migration(&tx, 2)?,
            Err(e) => {
                warn!("Migration 2 failed: {}", e);
                return Err(e);
            }
        }
    }

    tx.commit()?;

    info!("Migrations applied, current version: {}", MIGRATION_VERSION);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_migrations_upgrade_old_schema() {
        let conn = Connection::open_in_memory().unwrap();

        // Simulate a pre-migration database
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL UNIQUE,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                total_messages INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                uuid TEXT NOT NULL UNIQUE,
                session_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                tokens_used INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            );
            "#,
        )
        .unwrap();

        run_migrations(&conn).unwrap();

        assert!(column_exists(&conn, "messages", "response_time_ms").unwrap());
        assert!(column_exists(&conn, "messages", "metadata").unwrap());
        assert!(column_exists(&conn, "sessions", "total_tokens_used").unwrap());
        assert!(column_exists(&conn, "sessions", "last_message_preview").unwrap());

        assert_eq!(get_current_version(&conn).unwrap(), 2);

        // Running again must be idempotent
        run_migrations(&conn).unwrap();
        assert_eq!(get_current_version(&conn).unwrap(), 2);
    }

    #[test]
    fn test_migrations_skip_missing_tables() {
        let conn = Connection::open_in_memory().unwrap();

        // No tables at all: migrations are a no-op, schema creates everything
        run_migrations(&conn).unwrap();
        assert_eq!(get_current_version(&conn).unwrap(), 2);
    }
}
