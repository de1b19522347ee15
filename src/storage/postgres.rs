//! PostgreSQL-backed school store
//!
//! Connections come from a fixed-size deadpool pool. A checkout waits at most
//! `acquire_timeout` for a free connection and then fails with
//! [`StoreError::Pool`]; nothing is retried.

use async_trait::async_trait;
use deadpool_postgres::{
    Config as PgConfig, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime,
};
use tokio_postgres::{NoTls, Row};

use crate::config::DatabaseConfig;
use crate::models::{NewSchool, School};

use super::{SchoolStore, StoreError};

const CREATE_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS schools (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        address VARCHAR(500) NOT NULL,
        latitude DOUBLE PRECISION NOT NULL CHECK (latitude BETWEEN -90 AND 90),
        longitude DOUBLE PRECISION NOT NULL CHECK (longitude BETWEEN -180 AND 180),
        created_at TIMESTAMPTZ NULL DEFAULT NULL,
        updated_at TIMESTAMPTZ NULL DEFAULT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_schools_coordinates
        ON schools (latitude, longitude);
"#;

const INSERT_SCHOOL: &str =
    "INSERT INTO schools (name, address, latitude, longitude) VALUES ($1, $2, $3, $4) RETURNING id";

const SELECT_SCHOOLS: &str = "SELECT id, name, address, latitude, longitude, created_at, updated_at \
     FROM schools ORDER BY id";

/// School store on a PostgreSQL connection pool
pub struct PostgresSchoolStore {
    pool: Pool,
    max_size: usize,
}

impl PostgresSchoolStore {
    /// Build the pool; no connection is opened until first use
    pub fn new(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let mut cfg = PgConfig::new();
        cfg.host = Some(config.host.clone());
        cfg.port = Some(config.port);
        cfg.dbname = Some(config.name.clone());
        cfg.user = Some(config.user.clone()).filter(|u| !u.is_empty());
        cfg.password = config.password.clone();
        cfg.connect_timeout = Some(config.connect_timeout());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = PoolConfig::new(config.pool_size);
        pool_cfg.timeouts.wait = Some(config.acquire_timeout());
        pool_cfg.timeouts.create = Some(config.connect_timeout());
        cfg.pool = Some(pool_cfg);

        let pool = cfg.create_pool(Some(Runtime::Tokio1), NoTls)?;

        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.name,
            pool_size = config.pool_size,
            "PostgreSQL pool created"
        );

        Ok(Self {
            pool,
            max_size: config.pool_size,
        })
    }

    /// Get pool status
    pub fn pool_status(&self) -> PoolStatus {
        let status = self.pool.status();
        PoolStatus {
            size: status.size,
            available: status.available,
            waiting: status.waiting,
            max_size: self.max_size,
        }
    }
}

/// Connection pool status
#[derive(Debug, Clone)]
pub struct PoolStatus {
    /// Connections currently open
    pub size: usize,

    /// Idle connections
    pub available: usize,

    /// Callers queued for a connection
    pub waiting: usize,

    /// Configured maximum
    pub max_size: usize,
}

fn school_from_row(row: &Row) -> Result<School, tokio_postgres::Error> {
    Ok(School {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl SchoolStore for PostgresSchoolStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }

    async fn create_table(&self) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        client.batch_execute(CREATE_SCHEMA).await?;

        tracing::info!("Schools table initialized");
        Ok(())
    }

    async fn insert(&self, school: &NewSchool) -> Result<i64, StoreError> {
        let client = self.pool.get().await?;
        let stmt = client.prepare_cached(INSERT_SCHOOL).await?;

        let row = client
            .query_one(
                &stmt,
                &[
                    &school.name,
                    &school.address,
                    &school.latitude(),
                    &school.longitude(),
                ],
            )
            .await?;

        Ok(row.try_get("id")?)
    }

    async fn list_all(&self) -> Result<Vec<School>, StoreError> {
        let client = self.pool.get().await?;
        let stmt = client.prepare_cached(SELECT_SCHOOLS).await?;
        let rows = client.query(&stmt, &[]).await?;

        let schools = rows
            .iter()
            .map(school_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(schools)
    }
}
