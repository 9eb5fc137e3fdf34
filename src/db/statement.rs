//! Insert synthesis from the schema registry.
//!
//! Callers hand over only the fields they have; every other live column is
//! filled from the registry default. Adding an optional column to the
//! registry therefore needs no change at any call site.

use std::collections::BTreeMap;

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use super::migration::live_columns;
use super::schema::table_schema;
use super::DatabaseError;

/// Sparse column → value mapping for one row.
#[derive(Debug, Clone, Default)]
pub struct PartialRecord {
    fields: BTreeMap<String, Value>,
}

impl PartialRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column value. `Option::None` binds SQL NULL, which is distinct
    /// from leaving the column out (that binds the registry default).
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(column.to_string(), value.into());
        self
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.fields.insert(column.to_string(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// A synthesized `INSERT OR REPLACE` with its positional parameters.
#[derive(Debug, Clone)]
pub struct PreparedInsert {
    pub sql: String,
    pub columns: Vec<String>,
    pub params: Vec<Value>,
}

impl PreparedInsert {
    /// Bound value for a column, if the column is part of the statement.
    pub fn param(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.params[i])
    }

    /// Run the statement; returns the rowid of the inserted row.
    pub fn execute(&self, conn: &Connection) -> Result<i64, DatabaseError> {
        conn.execute(&self.sql, params_from_iter(self.params.iter()))?;
        Ok(conn.last_insert_rowid())
    }
}

/// Build an upsert covering every live column of `table`.
///
/// Autoincrement columns are left to the engine, even when `record`
/// supplies them. Present fields are bound as given; absent ones take the
/// registry default. Live columns the registry does not know bind NULL.
/// Supplied fields that end up unbound are logged at debug.
pub fn prepare_insert(
    conn: &Connection,
    table: &str,
    record: &PartialRecord,
) -> Result<PreparedInsert, DatabaseError> {
    let schema = table_schema(table)?;
    let live = live_columns(conn, table)?;

    let mut columns = Vec::with_capacity(live.len());
    let mut params = Vec::with_capacity(live.len());

    for name in live {
        let declared = schema.column(&name);
        if declared.is_some_and(|c| c.auto_increment) {
            continue;
        }
        let value = match record.get(&name) {
            Some(v) => v.clone(),
            None => declared.map_or(Value::Null, |c| c.default.to_value()),
        };
        columns.push(name);
        params.push(value);
    }

    for extra in record.columns().filter(|c| !columns.iter().any(|l| l == c)) {
        let reason = if schema.column(extra).is_some_and(|c| c.auto_increment) {
            "assigned by the engine"
        } else {
            "no live column"
        };
        tracing::debug!(table, column = extra, reason, "Ignoring supplied field");
    }

    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "INSERT OR REPLACE INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    );
    tracing::debug!(table, columns = columns.len(), "Prepared insert");

    Ok(PreparedInsert {
        sql,
        columns,
        params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migration::ensure_schema;

    fn migrated_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn);
        conn
    }

    #[test]
    fn omitted_avatar_binds_registry_default() {
        let conn = migrated_db();
        let record = PartialRecord::new()
            .with("id", "u1".to_string())
            .with("name", "A".to_string())
            .with("relationship", "self".to_string())
            .with("color", "#fff".to_string());

        let insert = prepare_insert(&conn, "users", &record).unwrap();

        assert_eq!(insert.param("avatar"), Some(&Value::Null));
        assert_eq!(insert.param("name"), Some(&Value::Text("A".into())));
        assert_eq!(
            insert.columns,
            vec!["id", "name", "avatar", "relationship", "color", "created_at"]
        );
        assert_eq!(
            insert.sql,
            "INSERT OR REPLACE INTO users (id, name, avatar, relationship, color, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
        );
        assert!(matches!(insert.param("created_at"), Some(Value::Text(_))));
    }

    #[test]
    fn autoincrement_column_is_skipped() {
        let conn = migrated_db();
        let record = PartialRecord::new()
            .with("id", 99_i64)
            .with("record_id", "r1".to_string())
            .with("name", "WBC".to_string());

        let insert = prepare_insert(&conn, "key_indicators", &record).unwrap();
        assert!(insert.param("id").is_none());
        assert_eq!(insert.param("value"), Some(&Value::Text(String::new())));
        assert_eq!(insert.param("is_abnormal"), Some(&Value::Integer(0)));
        assert_eq!(insert.param("normal_range"), Some(&Value::Null));
        assert!(!insert.sql.contains("(id,"));

        let rowid = insert.execute(&conn).unwrap();
        assert_eq!(rowid, 1);
        let stored: i64 = conn
            .query_row("SELECT id FROM key_indicators WHERE name = 'WBC'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(stored, 1);
    }

    #[test]
    fn explicit_none_binds_null_not_default() {
        let conn = migrated_db();
        let record = PartialRecord::new()
            .with("id", "x".to_string())
            .with("title", Option::<String>::None);
        let insert = prepare_insert(&conn, "medical_records", &record).unwrap();
        assert_eq!(insert.param("title"), Some(&Value::Null));
        assert_eq!(insert.param("hospital"), Some(&Value::Text(String::new())));
    }

    #[test]
    fn unknown_table_fails_loudly() {
        let conn = migrated_db();
        let err = prepare_insert(&conn, "prescriptions", &PartialRecord::new()).unwrap_err();
        assert!(matches!(err, DatabaseError::SchemaNotFound { .. }));
    }

    #[test]
    fn follows_live_column_order_including_unregistered_columns() {
        let conn = migrated_db();
        conn.execute_batch("ALTER TABLE users ADD COLUMN nickname TEXT")
            .unwrap();

        let record = PartialRecord::new()
            .with("id", "u1".to_string())
            .with("nickname", "Al".to_string())
            .with("not_a_column", 1_i64);
        let insert = prepare_insert(&conn, "users", &record).unwrap();

        assert_eq!(insert.columns.last().map(String::as_str), Some("nickname"));
        assert_eq!(insert.param("nickname"), Some(&Value::Text("Al".into())));
        assert!(insert.param("not_a_column").is_none());
    }

    #[test]
    fn execute_upserts_by_primary_key() {
        let conn = migrated_db();
        let first = PartialRecord::new()
            .with("id", "u1".to_string())
            .with("name", "Before".to_string());
        prepare_insert(&conn, "users", &first)
            .unwrap()
            .execute(&conn)
            .unwrap();

        let second = first.clone().with("name", "After".to_string());
        prepare_insert(&conn, "users", &second)
            .unwrap()
            .execute(&conn)
            .unwrap();

        let (count, name): (i64, String) = conn
            .query_row("SELECT COUNT(*), MAX(name) FROM users", [], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(name, "After");
    }

    #[test]
    fn execute_returns_generated_rowid() {
        let conn = migrated_db();
        let record = PartialRecord::new()
            .with("disease_id", "d1".to_string())
            .with("name", "BP".to_string());
        let first = prepare_insert(&conn, "disease_indicators", &record)
            .unwrap()
            .execute(&conn)
            .unwrap();
        let second = prepare_insert(&conn, "disease_indicators", &record)
            .unwrap()
            .execute(&conn)
            .unwrap();
        assert!(second > first);
    }
}
