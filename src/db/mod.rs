pub mod migration;
pub mod repository;
pub mod schema;
pub mod sqlite;
pub mod statement;

pub use migration::*;
pub use repository::*;
pub use schema::*;
pub use sqlite::*;
pub use statement::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No schema registered for table {table}")]
    SchemaNotFound { table: String },

    #[error("Failed to add column {table}.{column}: {reason}")]
    MigrationColumn {
        table: String,
        column: String,
        reason: String,
    },

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),
}
