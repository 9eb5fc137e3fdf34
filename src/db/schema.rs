//! Schema registry: the declared shape of every table in the archive.
//!
//! Two layers per table: a baseline `CREATE TABLE IF NOT EXISTS` used to
//! bootstrap a fresh database, and the column list the migration engine
//! reconciles live tables against. The baseline may lag the column list;
//! anything declared here but missing from a live table is added on the
//! next `ensure_schema`.

use chrono::Utc;
use rusqlite::types::Value;

use super::DatabaseError;

/// SQLite timestamp layout, identical to what `CURRENT_TIMESTAMP` produces.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    DateTime,
}

impl ColumnType {
    pub fn sql(self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::DateTime => "DATETIME",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnDefault {
    Null,
    Text(&'static str),
    Integer(i64),
    Real(f64),
    CurrentTimestamp,
}

impl ColumnDefault {
    /// Literal for an inline `DEFAULT` clause. `None` when there is nothing
    /// to declare (NULL is already SQLite's implicit default).
    pub fn sql_literal(&self) -> Option<String> {
        match self {
            ColumnDefault::Null => None,
            ColumnDefault::Text(s) => Some(format!("'{}'", s.replace('\'', "''"))),
            ColumnDefault::Integer(i) => Some(i.to_string()),
            ColumnDefault::Real(r) => Some(r.to_string()),
            ColumnDefault::CurrentTimestamp => Some("CURRENT_TIMESTAMP".to_string()),
        }
    }

    /// SQLite refuses `ALTER TABLE .. ADD COLUMN` with a non-constant default.
    pub fn is_constant(&self) -> bool {
        !matches!(self, ColumnDefault::CurrentTimestamp)
    }

    /// Value bound by the statement synthesizer when a field is omitted.
    pub fn to_value(&self) -> Value {
        match self {
            ColumnDefault::Null => Value::Null,
            ColumnDefault::Text(s) => Value::Text((*s).to_string()),
            ColumnDefault::Integer(i) => Value::Integer(*i),
            ColumnDefault::Real(r) => Value::Real(*r),
            ColumnDefault::CurrentTimestamp => {
                Value::Text(Utc::now().format(TIMESTAMP_FORMAT).to_string())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub default: ColumnDefault,
    pub nullable: bool,
    pub auto_increment: bool,
}

#[derive(Debug)]
pub struct TableSchema {
    pub name: &'static str,
    pub baseline_ddl: &'static str,
    pub columns: &'static [ColumnDef],
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }
}

const fn column(
    name: &'static str,
    column_type: ColumnType,
    default: ColumnDefault,
    nullable: bool,
) -> ColumnDef {
    ColumnDef {
        name,
        column_type,
        default,
        nullable,
        auto_increment: false,
    }
}

const fn auto_id(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        column_type: ColumnType::Integer,
        default: ColumnDefault::Null,
        nullable: false,
        auto_increment: true,
    }
}

const fn required_text(name: &'static str) -> ColumnDef {
    column(name, ColumnType::Text, ColumnDefault::Text(""), false)
}

const fn optional_text(name: &'static str) -> ColumnDef {
    column(name, ColumnType::Text, ColumnDefault::Null, true)
}

const fn flag(name: &'static str) -> ColumnDef {
    column(name, ColumnType::Integer, ColumnDefault::Integer(0), true)
}

const fn created_at() -> ColumnDef {
    column(
        "created_at",
        ColumnType::DateTime,
        ColumnDefault::CurrentTimestamp,
        true,
    )
}

pub const USERS: TableSchema = TableSchema {
    name: "users",
    baseline_ddl: "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        avatar TEXT,
        relationship TEXT NOT NULL,
        color TEXT NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )",
    columns: &[
        required_text("id"),
        required_text("name"),
        optional_text("avatar"),
        required_text("relationship"),
        required_text("color"),
        created_at(),
    ],
};

pub const MEDICAL_RECORDS: TableSchema = TableSchema {
    name: "medical_records",
    baseline_ddl: "CREATE TABLE IF NOT EXISTS medical_records (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        title TEXT NOT NULL,
        hospital TEXT NOT NULL,
        type TEXT NOT NULL,
        date TEXT NOT NULL,
        image_uri TEXT,
        description TEXT,
        is_abnormal INTEGER DEFAULT 0,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        disease_id TEXT,
        FOREIGN KEY (user_id) REFERENCES users (id)
    )",
    columns: &[
        required_text("id"),
        required_text("user_id"),
        required_text("title"),
        required_text("hospital"),
        required_text("type"),
        required_text("date"),
        optional_text("image_uri"),
        optional_text("description"),
        flag("is_abnormal"),
        created_at(),
        optional_text("disease_id"),
    ],
};

pub const KEY_INDICATORS: TableSchema = TableSchema {
    name: "key_indicators",
    baseline_ddl: "CREATE TABLE IF NOT EXISTS key_indicators (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        record_id TEXT NOT NULL,
        name TEXT NOT NULL,
        value TEXT NOT NULL,
        unit TEXT NOT NULL,
        normal_range TEXT,
        is_abnormal INTEGER DEFAULT 0,
        FOREIGN KEY (record_id) REFERENCES medical_records (id)
    )",
    columns: &[
        auto_id("id"),
        required_text("record_id"),
        required_text("name"),
        required_text("value"),
        required_text("unit"),
        optional_text("normal_range"),
        flag("is_abnormal"),
    ],
};

pub const CHRONIC_DISEASES: TableSchema = TableSchema {
    name: "chronic_diseases",
    baseline_ddl: "CREATE TABLE IF NOT EXISTS chronic_diseases (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        name TEXT NOT NULL,
        type TEXT NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (user_id) REFERENCES users (id)
    )",
    columns: &[
        required_text("id"),
        required_text("user_id"),
        required_text("name"),
        required_text("type"),
        created_at(),
    ],
};

pub const DISEASE_INDICATORS: TableSchema = TableSchema {
    name: "disease_indicators",
    baseline_ddl: "CREATE TABLE IF NOT EXISTS disease_indicators (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        disease_id TEXT NOT NULL,
        name TEXT NOT NULL,
        unit TEXT NOT NULL,
        normal_range TEXT NOT NULL,
        FOREIGN KEY (disease_id) REFERENCES chronic_diseases (id)
    )",
    columns: &[
        auto_id("id"),
        required_text("disease_id"),
        required_text("name"),
        required_text("unit"),
        required_text("normal_range"),
    ],
};

pub const INDICATOR_VALUES: TableSchema = TableSchema {
    name: "indicator_values",
    baseline_ddl: "CREATE TABLE IF NOT EXISTS indicator_values (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        indicator_id INTEGER NOT NULL,
        date TEXT NOT NULL,
        value REAL NOT NULL,
        is_abnormal INTEGER DEFAULT 0,
        FOREIGN KEY (indicator_id) REFERENCES disease_indicators (id)
    )",
    columns: &[
        auto_id("id"),
        column("indicator_id", ColumnType::Integer, ColumnDefault::Integer(0), false),
        required_text("date"),
        column("value", ColumnType::Real, ColumnDefault::Real(0.0), false),
        flag("is_abnormal"),
    ],
};

pub const HEALTH_REMINDERS: TableSchema = TableSchema {
    name: "health_reminders",
    baseline_ddl: "CREATE TABLE IF NOT EXISTS health_reminders (
        id TEXT PRIMARY KEY,
        disease_id TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        date TEXT NOT NULL,
        type TEXT NOT NULL,
        is_completed INTEGER DEFAULT 0,
        is_repeating INTEGER DEFAULT 0,
        repeat_interval INTEGER,
        FOREIGN KEY (disease_id) REFERENCES chronic_diseases (id)
    )",
    columns: &[
        required_text("id"),
        required_text("disease_id"),
        required_text("title"),
        required_text("description"),
        required_text("date"),
        required_text("type"),
        flag("is_completed"),
        flag("is_repeating"),
        column("repeat_interval", ColumnType::Integer, ColumnDefault::Null, true),
    ],
};

/// Every registered table, parents before children.
pub static TABLES: &[TableSchema] = &[
    USERS,
    MEDICAL_RECORDS,
    KEY_INDICATORS,
    CHRONIC_DISEASES,
    DISEASE_INDICATORS,
    INDICATOR_VALUES,
    HEALTH_REMINDERS,
];

/// Look up a table's declared schema.
pub fn table_schema(table: &str) -> Result<&'static TableSchema, DatabaseError> {
    TABLES
        .iter()
        .find(|t| t.name == table)
        .ok_or_else(|| DatabaseError::SchemaNotFound {
            table: table.to_string(),
        })
}
