use std::path::Path;

use rusqlite::Connection;
use tracing;

use super::migration::{ensure_schema, MigrationReport};
use super::DatabaseError;

/// Open a SQLite connection to the given path and bring its schema up to date
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    let report = ensure_schema(&conn);
    log_report(path, &report);
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    ensure_schema(&conn);
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    // Foreign keys stay unenforced: records may name a user that was never
    // stored. Deletes cascade explicitly in the repositories.
    conn.execute_batch("PRAGMA journal_mode=DELETE;")?;
    Ok(())
}

fn log_report(path: &Path, report: &MigrationReport) {
    if !report.is_clean() {
        tracing::warn!(
            path = %path.display(),
            failures = report.failures.len(),
            "Database opened with a partially migrated schema"
        );
    } else {
        tracing::info!(path = %path.display(), "Database ready");
    }
}

/// Count tables in the database (for verification)
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}
