//! Async handle over the archive database.
//!
//! `HealthStore` is what the UI layer holds. It owns a single connection
//! behind a mutex, opened once by `init()`. Each operation runs the
//! matching repository function on tokio's blocking pool, so calls are
//! serialized on the connection in the order they acquire the lock.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config;
use crate::db::{self, DatabaseError};
use crate::models::*;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store used before init()")]
    NotInitialized,
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Blocking task failed: {0}")]
    Join(String),
}

/// Where the connection comes from.
#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

struct StoreInner {
    location: Location,
    conn: Mutex<Option<Connection>>,
}

/// Cloneable handle; clones share the same connection.
#[derive(Clone)]
pub struct HealthStore {
    inner: Arc<StoreInner>,
}

impl HealthStore {
    /// Handle for the database file at `path`. Nothing is opened until `init()`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_location(Location::File(path.into()))
    }

    /// Handle for the default database under the application data directory.
    pub fn at_default_location() -> Option<Self> {
        config::database_path().map(Self::new)
    }

    /// Handle for a private in-memory database.
    pub fn in_memory() -> Self {
        Self::with_location(Location::Memory)
    }

    fn with_location(location: Location) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                location,
                conn: Mutex::new(None),
            }),
        }
    }

    /// Path of the backing file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&std::path::Path> {
        match &self.inner.location {
            Location::File(path) => Some(path),
            Location::Memory => None,
        }
    }

    pub fn is_initialized(&self) -> Result<bool, StoreError> {
        let guard = self.inner.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(guard.is_some())
    }

    /// Open the database and bring its schema up to date. Calling it again
    /// is a no-op.
    pub async fn init(&self) -> Result<(), StoreError> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut guard = inner.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
            if guard.is_some() {
                tracing::debug!("Store already initialized");
                return Ok(());
            }
            let conn = match &inner.location {
                Location::File(path) => db::open_database(path)?,
                Location::Memory => db::open_memory_database()?,
            };
            *guard = Some(conn);
            tracing::info!(location = ?inner.location, "Health store initialized");
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))?
    }

    /// Run `op` against the open connection on the blocking pool.
    async fn with_conn<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, DatabaseError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let guard = inner.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
            let conn = guard.as_ref().ok_or(StoreError::NotInitialized)?;
            op(conn).map_err(StoreError::from)
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))?
    }

    // ── Users ───────────────────────────────────────────────

    pub async fn add_user(&self, user: User) -> Result<(), StoreError> {
        self.with_conn(move |conn| db::add_user(conn, &user)).await
    }

    pub async fn get_users(&self) -> Result<Vec<User>, StoreError> {
        self.with_conn(db::get_users).await
    }

    pub async fn update_user(&self, user: User) -> Result<(), StoreError> {
        self.with_conn(move |conn| db::update_user(conn, &user)).await
    }

    /// Deletes the user with all of their records and diseases.
    pub async fn delete_user(&self, user_id: &str) -> Result<(), StoreError> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| db::delete_user(conn, &user_id)).await
    }

    // ── Medical records ─────────────────────────────────────

    pub async fn add_medical_record(&self, record: MedicalRecord) -> Result<(), StoreError> {
        self.with_conn(move |conn| db::add_medical_record(conn, &record)).await
    }

    pub async fn get_medical_records(
        &self,
        filter: RecordFilter,
    ) -> Result<Vec<MedicalRecord>, StoreError> {
        self.with_conn(move |conn| db::get_medical_records(conn, &filter)).await
    }

    pub async fn get_medical_records_by_disease(
        &self,
        disease_id: &str,
    ) -> Result<Vec<MedicalRecord>, StoreError> {
        let disease_id = disease_id.to_string();
        self.with_conn(move |conn| db::get_medical_records_by_disease(conn, &disease_id))
            .await
    }

    pub async fn delete_medical_record(&self, record_id: &str) -> Result<(), StoreError> {
        let record_id = record_id.to_string();
        self.with_conn(move |conn| db::delete_medical_record(conn, &record_id))
            .await
    }

    // ── Chronic diseases ────────────────────────────────────

    pub async fn add_chronic_disease(&self, disease: ChronicDisease) -> Result<(), StoreError> {
        self.with_conn(move |conn| db::add_chronic_disease(conn, &disease)).await
    }

    pub async fn get_chronic_diseases(
        &self,
        user_id: Option<&str>,
    ) -> Result<Vec<ChronicDisease>, StoreError> {
        let user_id = user_id.map(str::to_string);
        self.with_conn(move |conn| db::get_chronic_diseases(conn, user_id.as_deref()))
            .await
    }

    pub async fn delete_chronic_disease(&self, disease_id: &str) -> Result<(), StoreError> {
        let disease_id = disease_id.to_string();
        self.with_conn(move |conn| db::delete_chronic_disease(conn, &disease_id))
            .await
    }

    pub async fn set_reminder_completed(
        &self,
        reminder_id: &str,
        completed: bool,
    ) -> Result<(), StoreError> {
        let reminder_id = reminder_id.to_string();
        self.with_conn(move |conn| db::set_reminder_completed(conn, &reminder_id, completed))
            .await
    }

    // ── Statistics & maintenance ────────────────────────────

    pub async fn get_statistics(&self, user_id: Option<&str>) -> Result<Statistics, StoreError> {
        let user_id = user_id.map(str::to_string);
        self.with_conn(move |conn| db::get_statistics(conn, user_id.as_deref()))
            .await
    }

    /// Wipes every table. Asking the user for confirmation is up to the caller.
    pub async fn clear_all_data(&self) -> Result<(), StoreError> {
        self.with_conn(db::clear_all_data).await
    }
}
