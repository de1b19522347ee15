//! HTTP interface
//!
//! ```text
//! GET  /                   service description
//! GET  /health             liveness
//! POST /api/addSchool      store a school
//! GET  /api/listSchools    schools by distance from ?latitude=&longitude=
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use schoolmap::config::Config;
//! use schoolmap::http::{shutdown_signal, SchoolServer};
//!
//! let config = Config::from_env()?;
//! let server = SchoolServer::bootstrap(&config).await?;
//! server.start_with_shutdown(shutdown_signal()).await?;
//! ```

pub mod api;
pub mod server;

pub use api::{create_router, ApiResponse, MessageResponse, MAX_BODY_BYTES};
pub use server::{init_store, shutdown_signal, AppState, SchoolServer, ServerError};
