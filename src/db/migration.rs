//! Additive schema migration.
//!
//! There is no stored schema version. On every start each registered table
//! is created if absent, its live columns are introspected, and any column
//! the registry declares but the table lacks is added. Columns are never
//! dropped or renamed.

use std::collections::HashSet;

use rusqlite::Connection;
use tracing;

use super::schema::{ColumnDef, TableSchema, TABLES};
use super::DatabaseError;

/// Outcome of one `ensure_schema` pass.
#[derive(Debug, Default)]
pub struct MigrationReport {
    pub tables_checked: usize,
    /// `(table, column)` pairs added during this pass.
    pub columns_added: Vec<(String, String)>,
    /// Failures that were logged and skipped.
    pub failures: Vec<DatabaseError>,
}

impl MigrationReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Bring every registered table up to its declared column set.
///
/// Never fails as a whole: per-table and per-column errors are logged and
/// collected in the report, and migration moves on to the next item.
pub fn ensure_schema(conn: &Connection) -> MigrationReport {
    ensure_tables(conn, TABLES)
}

pub(crate) fn ensure_tables(conn: &Connection, tables: &[TableSchema]) -> MigrationReport {
    let mut report = MigrationReport::default();

    for table in tables {
        report.tables_checked += 1;
        if let Err(e) = migrate_table(conn, table, &mut report) {
            tracing::warn!(table = table.name, error = %e, "Table migration failed");
            report.failures.push(e);
        }
    }

    if report.columns_added.is_empty() && report.is_clean() {
        tracing::debug!(tables = report.tables_checked, "Schema up to date");
    } else {
        tracing::info!(
            tables = report.tables_checked,
            added = report.columns_added.len(),
            failed = report.failures.len(),
            "Schema migration finished"
        );
    }
    report
}

fn migrate_table(
    conn: &Connection,
    table: &TableSchema,
    report: &mut MigrationReport,
) -> Result<(), DatabaseError> {
    conn.execute_batch(table.baseline_ddl)?;

    let existing: HashSet<String> = live_columns(conn, table.name)?.into_iter().collect();

    for column in table.columns.iter().filter(|c| !existing.contains(c.name)) {
        match add_column(conn, table.name, column) {
            Ok(()) => {
                tracing::info!(table = table.name, column = column.name, "Added column");
                report
                    .columns_added
                    .push((table.name.to_string(), column.name.to_string()));
            }
            Err(e) => {
                tracing::warn!(table = table.name, column = column.name, error = %e, "Could not add column");
                report.failures.push(e);
            }
        }
    }
    Ok(())
}

/// Column names of a live table, in declaration order. Empty if the table
/// does not exist.
pub fn live_columns(conn: &Connection, table: &str) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
    let names = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

/// `ALTER TABLE .. ADD COLUMN` statement for a declared column.
///
/// Non-constant defaults cannot appear in `ADD COLUMN`; those columns are
/// added bare and back-filled by `add_column`.
pub fn add_column_sql(table: &str, column: &ColumnDef) -> String {
    let mut sql = format!(
        "ALTER TABLE {table} ADD COLUMN {} {}",
        column.name,
        column.column_type.sql()
    );
    if column.default.is_constant() {
        if let Some(literal) = column.default.sql_literal() {
            sql.push_str(" DEFAULT ");
            sql.push_str(&literal);
        }
    }
    if !column.nullable {
        sql.push_str(" NOT NULL");
    }
    sql
}

fn add_column(conn: &Connection, table: &str, column: &ColumnDef) -> Result<(), DatabaseError> {
    let to_err = |e: rusqlite::Error| DatabaseError::MigrationColumn {
        table: table.to_string(),
        column: column.name.to_string(),
        reason: e.to_string(),
    };

    conn.execute_batch(&add_column_sql(table, column))
        .map_err(to_err)?;

    if !column.default.is_constant() {
        if let Some(literal) = column.default.sql_literal() {
            let backfilled = conn
                .execute(
                    &format!(
                        "UPDATE {table} SET {col} = {literal} WHERE {col} IS NULL",
                        col = column.name
                    ),
                    [],
                )
                .map_err(to_err)?;
            tracing::debug!(table, column = column.name, rows = backfilled, "Back-filled new column");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::{table_schema, ColumnDefault, ColumnType};

    fn bare_db() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn creates_every_table_on_empty_database() {
        let conn = bare_db();
        let report = ensure_schema(&conn);
        assert!(report.is_clean(), "{:?}", report.failures);
        assert_eq!(report.tables_checked, TABLES.len());
        // Baselines already match the registry, nothing to add.
        assert!(report.columns_added.is_empty());

        for table in TABLES {
            let live = live_columns(&conn, table.name).unwrap();
            let declared: Vec<_> = table.column_names().map(String::from).collect();
            assert_eq!(live, declared, "{}", table.name);
        }
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let conn = bare_db();
        ensure_schema(&conn);
        let before = live_columns(&conn, "medical_records").unwrap();

        let report = ensure_schema(&conn);
        assert!(report.is_clean());
        assert!(report.columns_added.is_empty());
        assert_eq!(live_columns(&conn, "medical_records").unwrap(), before);
    }

    #[test]
    fn adds_missing_columns_to_legacy_table() {
        let conn = bare_db();
        // An older install, before image_uri/description/disease_id existed.
        conn.execute_batch(
            "CREATE TABLE medical_records (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                hospital TEXT NOT NULL,
                type TEXT NOT NULL,
                date TEXT NOT NULL,
                is_abnormal INTEGER DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            INSERT INTO medical_records (id, user_id, title, hospital, type, date)
            VALUES ('r0', 'u0', 'Old', 'H', 'blood', '2023-05-01');",
        )
        .unwrap();

        let report = ensure_schema(&conn);
        assert!(report.is_clean(), "{:?}", report.failures);

        let added: Vec<_> = report
            .columns_added
            .iter()
            .filter(|(t, _)| t == "medical_records")
            .map(|(_, c)| c.as_str())
            .collect();
        assert_eq!(added, vec!["image_uri", "description", "disease_id"]);

        let mut live = live_columns(&conn, "medical_records").unwrap();
        let mut declared: Vec<_> = table_schema("medical_records")
            .unwrap()
            .column_names()
            .map(String::from)
            .collect();
        live.sort();
        declared.sort();
        assert_eq!(live, declared);

        // Existing row survives with NULL in the new nullable columns.
        let disease: Option<String> = conn
            .query_row("SELECT disease_id FROM medical_records WHERE id = 'r0'", [], |r| r.get(0))
            .unwrap();
        assert!(disease.is_none());
    }

    #[test]
    fn new_not_null_column_gets_declared_default_on_existing_rows() {
        let conn = bare_db();
        conn.execute_batch(
            "CREATE TABLE users (id TEXT PRIMARY KEY, name TEXT NOT NULL);
             INSERT INTO users (id, name) VALUES ('u1', 'Ann');",
        )
        .unwrap();

        let report = ensure_schema(&conn);
        assert!(report.is_clean(), "{:?}", report.failures);

        let (relationship, color): (String, String) = conn
            .query_row("SELECT relationship, color FROM users WHERE id = 'u1'", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(relationship, "");
        assert_eq!(color, "");
    }

    #[test]
    fn timestamp_column_is_backfilled() {
        let conn = bare_db();
        conn.execute_batch(
            "CREATE TABLE chronic_diseases (
                id TEXT PRIMARY KEY, user_id TEXT NOT NULL, name TEXT NOT NULL, type TEXT NOT NULL
             );
             INSERT INTO chronic_diseases VALUES ('d1', 'u1', 'Hypertension', 'hypertension');",
        )
        .unwrap();

        let report = ensure_schema(&conn);
        assert!(report.is_clean(), "{:?}", report.failures);
        assert!(report
            .columns_added
            .contains(&("chronic_diseases".to_string(), "created_at".to_string())));

        let created: Option<String> = conn
            .query_row("SELECT created_at FROM chronic_diseases WHERE id = 'd1'", [], |r| r.get(0))
            .unwrap();
        assert!(created.is_some());
    }

    #[test]
    fn failing_column_is_reported_and_migration_continues() {
        static BROKEN: &[ColumnDef] = &[
            ColumnDef {
                name: "id",
                column_type: ColumnType::Text,
                default: ColumnDefault::Text(""),
                nullable: false,
                auto_increment: false,
            },
            // NOT NULL without a default on a populated table.
            ColumnDef {
                name: "strict_col",
                column_type: ColumnType::Text,
                default: ColumnDefault::Null,
                nullable: false,
                auto_increment: false,
            },
            ColumnDef {
                name: "loose_col",
                column_type: ColumnType::Text,
                default: ColumnDefault::Null,
                nullable: true,
                auto_increment: false,
            },
        ];
        let tables = [
            TableSchema {
                name: "legacy",
                baseline_ddl: "CREATE TABLE IF NOT EXISTS legacy (id TEXT PRIMARY KEY)",
                columns: BROKEN,
            },
            TableSchema {
                name: "other",
                baseline_ddl: "CREATE TABLE IF NOT EXISTS other (id TEXT PRIMARY KEY)",
                columns: &BROKEN[..1],
            },
        ];

        let conn = bare_db();
        // The NOT NULL check only fires once the table holds rows.
        conn.execute_batch(
            "CREATE TABLE legacy (id TEXT PRIMARY KEY);
             INSERT INTO legacy (id) VALUES ('x');",
        )
        .unwrap();
        let report = ensure_tables(&conn, &tables);

        assert_eq!(report.tables_checked, 2);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            &report.failures[0],
            DatabaseError::MigrationColumn { table, column, .. } if table == "legacy" && column == "strict_col"
        ));
        assert_eq!(
            live_columns(&conn, "legacy").unwrap(),
            vec!["id".to_string(), "loose_col".to_string()]
        );
        assert_eq!(live_columns(&conn, "other").unwrap(), vec!["id".to_string()]);
    }

    #[test]
    fn add_column_sql_shapes() {
        let users = table_schema("users").unwrap();
        assert_eq!(
            add_column_sql("users", users.column("color").unwrap()),
            "ALTER TABLE users ADD COLUMN color TEXT DEFAULT '' NOT NULL"
        );
        assert_eq!(
            add_column_sql("users", users.column("avatar").unwrap()),
            "ALTER TABLE users ADD COLUMN avatar TEXT"
        );
        assert_eq!(
            add_column_sql("users", users.column("created_at").unwrap()),
            "ALTER TABLE users ADD COLUMN created_at DATETIME"
        );
    }

    #[test]
    fn live_columns_of_missing_table_is_empty() {
        let conn = bare_db();
        assert!(live_columns(&conn, "nope").unwrap().is_empty());
    }
}
