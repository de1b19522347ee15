//! schoolmap - school directory with proximity search
//!
//! Stores schools with their coordinates and lists them ordered by
//! great-circle distance from a caller-supplied point.
//!
//! # Architecture
//!
//! - [`config`] - Configuration from environment or TOML
//! - [`geo`] - Haversine distance and proximity ranking
//! - [`models`] - School records and ranked results
//! - [`validation`] - Request input checks
//! - [`storage`] - School stores (PostgreSQL, SQLite, in-memory)
//! - [`http`] - Axum router, handlers and server lifecycle
//! - [`error`] - Unified error type
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use schoolmap::http::{create_router, AppState};
//! use schoolmap::storage::MockSchoolStore;
//!
//! let router = create_router(AppState::new(Arc::new(MockSchoolStore::new())));
//! # let _ = router;
//! ```

pub mod config;
pub mod error;
pub mod geo;
pub mod http;
pub mod models;
pub mod storage;
pub mod validation;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::geo::{haversine_km, rank, Coordinate};
    pub use crate::models::{NewSchool, RankedSchool, School};
    pub use crate::storage::{SchoolStore, SharedSchoolStore};
}

// Direct re-exports for convenience
pub use models::{NewSchool, RankedSchool, School};
