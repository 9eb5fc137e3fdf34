use rusqlite::Connection;

use crate::db::schema::TABLES;
use crate::db::DatabaseError;

/// Delete every row of every registered table. Tables are emptied children
/// first inside one transaction. Confirmation is the caller's job.
pub fn clear_all_data(conn: &Connection) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    let mut total = 0;
    for table in TABLES.iter().rev() {
        total += tx.execute(&format!("DELETE FROM {}", table.name), [])?;
    }
    tx.commit()?;

    tracing::info!(rows = total, "Cleared all archive data");
    Ok(())
}
