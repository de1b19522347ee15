//! Persistence for school records
//!
//! The HTTP layer talks to a [`SchoolStore`] trait object, so the backing
//! datastore is chosen once at startup and injected through application
//! state:
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              API handlers (AppState)            │
//! └─────────────────────────────────────────────────┘
//!                         │
//!                         ▼
//! ┌─────────────────────────────────────────────────┐
//! │           SchoolStore (Arc<dyn ...>)            │
//! └─────────────────────────────────────────────────┘
//!          │                │                │
//!          ▼                ▼                ▼
//! ┌────────────────┐ ┌──────────────┐ ┌──────────────┐
//! │   PostgreSQL   │ │    SQLite    │ │     Mock     │
//! │ (deadpool pool)│ │ (single file)│ │ (in-memory)  │
//! └────────────────┘ └──────────────┘ └──────────────┘
//! ```
//!
//! Every user-supplied value reaches SQL through parameter binding.

pub mod mock;
pub mod postgres;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{DatabaseConfig, StoreBackend};
use crate::models::{NewSchool, School};

pub use mock::MockSchoolStore;
pub use postgres::PostgresSchoolStore;
pub use sqlite::SqliteSchoolStore;

/// Name of the schools table
pub const SCHOOLS_TABLE: &str = "schools";

// ============================================================================
// Errors
// ============================================================================

/// Persistence failures
///
/// None of these are retried; the request that hit one fails.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Pool could not be built from the configuration
    #[error("Failed to create connection pool: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),

    /// Connection checkout failed or timed out
    #[error("Connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// PostgreSQL query error
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// SQLite query error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem error while opening a store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A thread panicked while holding the store lock
    #[error("Store lock poisoned")]
    LockPoisoned,

    /// Store refused the operation
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

// ============================================================================
// Store trait
// ============================================================================

/// Durable storage of school records
#[async_trait]
pub trait SchoolStore: Send + Sync {
    /// Short backend name for logs
    fn backend(&self) -> &'static str;

    /// Round-trip to the datastore
    async fn ping(&self) -> Result<(), StoreError>;

    /// Create the schools table and its coordinate index if missing
    async fn create_table(&self) -> Result<(), StoreError>;

    /// Insert a validated school, returning the generated id
    async fn insert(&self, school: &NewSchool) -> Result<i64, StoreError>;

    /// Every stored school, in id order
    async fn list_all(&self) -> Result<Vec<School>, StoreError>;
}

/// Thread-safe shared store handle
pub type SharedSchoolStore = Arc<dyn SchoolStore>;

/// Build the store selected by the configuration
///
/// No connection is made here; call [`SchoolStore::ping`] to check
/// reachability.
pub fn open_store(config: &DatabaseConfig) -> Result<SharedSchoolStore, StoreError> {
    let store: SharedSchoolStore = match config.backend {
        StoreBackend::Postgres => Arc::new(PostgresSchoolStore::new(config)?),
        StoreBackend::Sqlite => Arc::new(SqliteSchoolStore::new(&config.sqlite_path)?),
    };

    tracing::debug!(backend = store.backend(), "School store opened");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;

    fn new_school(name: &str, lat: f64, lon: f64) -> NewSchool {
        NewSchool {
            name: name.to_string(),
            address: format!("{name} Street"),
            location: Coordinate::new(lat, lon).unwrap(),
        }
    }

    // Every in-process backend must behave the same way
    fn create_test_stores() -> Vec<Box<dyn SchoolStore>> {
        vec![
            Box::new(SqliteSchoolStore::in_memory().unwrap()),
            Box::new(MockSchoolStore::new()),
        ]
    }

    // Backend contract checks; each expects a store whose table is empty or absent

    pub(super) async fn check_create_table_is_idempotent(store: &dyn SchoolStore) {
        store.create_table().await.unwrap();
        store.create_table().await.unwrap();
        store.ping().await.unwrap();
    }

    pub(super) async fn check_insert_returns_increasing_ids(store: &dyn SchoolStore) {
        store.create_table().await.unwrap();

        let first = store.insert(&new_school("A", 1.0, 1.0)).await.unwrap();
        let second = store.insert(&new_school("B", 2.0, 2.0)).await.unwrap();

        assert!(first > 0, "{}", store.backend());
        assert!(second > first, "{}", store.backend());
    }

    pub(super) async fn check_list_all_round_trips_fields(store: &dyn SchoolStore) {
        store.create_table().await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());

        let id = store
            .insert(&new_school("O'Brien's Academy", -33.86, 151.2))
            .await
            .unwrap();
        let schools = store.list_all().await.unwrap();

        assert_eq!(schools.len(), 1);
        assert_eq!(schools[0].id, id);
        assert_eq!(schools[0].name, "O'Brien's Academy");
        assert_eq!(schools[0].address, "O'Brien's Academy Street");
        assert_eq!(schools[0].latitude, -33.86);
        assert_eq!(schools[0].longitude, 151.2);
        assert!(schools[0].created_at.is_none());
        assert!(schools[0].updated_at.is_none());
    }

    pub(super) async fn check_sql_metacharacters_are_stored_verbatim(store: &dyn SchoolStore) {
        store.create_table().await.unwrap();

        let name = "x'); DROP TABLE schools; --";
        store.insert(&new_school(name, 0.0, 0.0)).await.unwrap();
        store.insert(&new_school("after", 0.0, 0.0)).await.unwrap();

        let schools = store.list_all().await.unwrap();
        assert_eq!(schools.len(), 2);
        assert_eq!(schools[0].name, name);
        assert_eq!(schools[1].name, "after");
    }

    #[tokio::test]
    async fn test_create_table_is_idempotent() {
        for store in create_test_stores() {
            check_create_table_is_idempotent(store.as_ref()).await;
        }
    }

    #[tokio::test]
    async fn test_insert_returns_increasing_ids() {
        for store in create_test_stores() {
            check_insert_returns_increasing_ids(store.as_ref()).await;
        }
    }

    #[tokio::test]
    async fn test_list_all_round_trips_fields() {
        for store in create_test_stores() {
            check_list_all_round_trips_fields(store.as_ref()).await;
        }
    }

    #[tokio::test]
    async fn test_sql_metacharacters_are_stored_verbatim() {
        for store in create_test_stores() {
            check_sql_metacharacters_are_stored_verbatim(store.as_ref()).await;
        }
    }

    #[test]
    fn test_open_sqlite_store_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            backend: StoreBackend::Sqlite,
            sqlite_path: dir.path().join("nested").join("schools.db"),
            ..DatabaseConfig::default()
        };

        let store = open_store(&config).unwrap();
        assert_eq!(store.backend(), "sqlite");
    }
}
