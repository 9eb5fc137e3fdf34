use rusqlite::{params_from_iter, Connection};

use crate::db::DatabaseError;
use crate::models::Statistics;

/// Dashboard counters, optionally scoped to one user.
///
/// Four independent queries; under concurrent writes the counts are not a
/// single point-in-time snapshot.
pub fn get_statistics(conn: &Connection, user_id: Option<&str>) -> Result<Statistics, DatabaseError> {
    Ok(Statistics {
        total_records: count(conn, "SELECT COUNT(*) FROM medical_records", &[], "user_id", user_id)?,
        chronic_diseases: count(conn, "SELECT COUNT(*) FROM chronic_diseases", &[], "user_id", user_id)?,
        pending_reminders: count(
            conn,
            "SELECT COUNT(*) FROM health_reminders hr
             JOIN chronic_diseases cd ON hr.disease_id = cd.id",
            &["COALESCE(hr.is_completed, 0) = 0"],
            "cd.user_id",
            user_id,
        )?,
        abnormal_records: count(
            conn,
            "SELECT COUNT(*) FROM medical_records",
            &["is_abnormal = 1"],
            "user_id",
            user_id,
        )?,
    })
}

fn count(
    conn: &Connection,
    select: &str,
    fixed: &[&str],
    user_column: &str,
    user_id: Option<&str>,
) -> Result<i64, DatabaseError> {
    let mut conditions: Vec<String> = fixed.iter().map(|c| c.to_string()).collect();
    let mut params = Vec::new();
    if let Some(uid) = user_id {
        conditions.push(format!("{user_column} = ?1"));
        params.push(uid);
    }

    let sql = if conditions.is_empty() {
        select.to_string()
    } else {
        format!("{select} WHERE {}", conditions.join(" AND "))
    };
    let n = conn.query_row(&sql, params_from_iter(params), |row| row.get::<_, i64>(0))?;
    Ok(n)
}
