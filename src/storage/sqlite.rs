//! SQLite-backed school store
//!
//! Single-connection store for local runs and tests. The connection sits
//! behind a `Mutex`; each operation holds the lock for one statement and
//! never across an await point.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::models::{NewSchool, School};

use super::{SchoolStore, StoreError};

/// SQLite implementation of [`SchoolStore`]
pub struct SqliteSchoolStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteSchoolStore {
    /// Open (or create) a database file
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        tracing::info!(path = %path.display(), "SQLite store opened");

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Create in-memory store (for testing)
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Database file, if not in-memory
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn school_from_row(row: &Row<'_>) -> rusqlite::Result<School> {
    Ok(School {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        created_at: parse_timestamp(row.get(5)?),
        updated_at: parse_timestamp(row.get(6)?),
    })
}

#[async_trait]
impl SchoolStore for SqliteSchoolStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    async fn create_table(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
                CREATE TABLE IF NOT EXISTS schools (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    address TEXT NOT NULL,
                    latitude REAL NOT NULL CHECK (latitude BETWEEN -90 AND 90),
                    longitude REAL NOT NULL CHECK (longitude BETWEEN -180 AND 180),
                    created_at TEXT NULL DEFAULT NULL,
                    updated_at TEXT NULL DEFAULT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_schools_coordinates
                    ON schools(latitude, longitude);
                "#,
        )?;

        tracing::info!("Schools table initialized");
        Ok(())
    }

    async fn insert(&self, school: &NewSchool) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO schools (name, address, latitude, longitude) VALUES (?1, ?2, ?3, ?4)",
            params![
                school.name,
                school.address,
                school.latitude(),
                school.longitude()
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    async fn list_all(&self) -> Result<Vec<School>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, name, address, latitude, longitude, created_at, updated_at \
             FROM schools ORDER BY id",
        )?;

        let schools = stmt
            .query_map([], school_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(schools)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;

    #[tokio::test]
    async fn test_file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schools.db");

        {
            let store = SqliteSchoolStore::new(&path).unwrap();
            store.create_table().await.unwrap();
            store
                .insert(&NewSchool {
                    name: "Bishop Cotton".to_string(),
                    address: "St Marks Road".to_string(),
                    location: Coordinate::new(12.97, 77.6).unwrap(),
                })
                .await
                .unwrap();
        }

        let reopened = SqliteSchoolStore::new(&path).unwrap();
        reopened.create_table().await.unwrap();
        let schools = reopened.list_all().await.unwrap();

        assert_eq!(reopened.path(), Some(path.as_path()));
        assert_eq!(schools.len(), 1);
        assert_eq!(schools[0].name, "Bishop Cotton");
    }

    #[tokio::test]
    async fn test_ids_are_not_reused() {
        let store = SqliteSchoolStore::in_memory().unwrap();
        store.create_table().await.unwrap();

        let school = NewSchool {
            name: "A".to_string(),
            address: "B".to_string(),
            location: Coordinate::new(0.0, 0.0).unwrap(),
        };

        let first = store.insert(&school).await.unwrap();
        store
            .lock()
            .unwrap()
            .execute("DELETE FROM schools WHERE id = ?1", params![first])
            .unwrap();
        let second = store.insert(&school).await.unwrap();

        assert!(second > first);
    }

    #[tokio::test]
    async fn test_timestamps_are_parsed_when_present() {
        let store = SqliteSchoolStore::in_memory().unwrap();
        store.create_table().await.unwrap();
        store
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO schools (name, address, latitude, longitude, created_at) \
                 VALUES ('A', 'B', 1.0, 2.0, '2024-06-01T08:30:00Z')",
                [],
            )
            .unwrap();

        let schools = store.list_all().await.unwrap();
        let created = schools[0].created_at.unwrap();

        assert_eq!(created.to_rfc3339(), "2024-06-01T08:30:00+00:00");
        assert!(schools[0].updated_at.is_none());
    }

    #[tokio::test]
    async fn test_missing_table_is_an_error() {
        let store = SqliteSchoolStore::in_memory().unwrap();
        let err = store.list_all().await.unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }
}
