//! Unified error handling for the schoolmap crate
//!
//! Domain errors live next to the code that raises them
//! ([`ValidationError`], [`StoreError`], [`ConfigError`], [`ServerError`]);
//! this module folds them into one [`Error`] enum and classifies each one
//! into an [`ErrorCategory`] that decides the HTTP status and whether the
//! detail may be shown to a client.

use axum::http::StatusCode;
use thiserror::Error;

pub use crate::config::ConfigError;
pub use crate::http::ServerError;
pub use crate::storage::StoreError;
pub use crate::validation::ValidationError;

/// Message returned to clients for every server-side failure
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed, missing or out-of-range client input
    Validation,
    /// Datastore failures
    Storage,
    /// Configuration errors
    Config,
    /// Startup and serving errors
    Server,
}

impl ErrorCategory {
    /// HTTP status used when an error of this category ends a request
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Storage | Self::Config | Self::Server => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Unified error type for the schoolmap crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Store(_) => ErrorCategory::Storage,
            Self::Config(_) => ErrorCategory::Config,
            Self::Server(_) => ErrorCategory::Server,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(e) => e.status_code(),
            _ => self.category().status_code(),
        }
    }

    /// Text safe to send to a client
    ///
    /// Only validation errors carry their detail; everything else collapses
    /// to [`INTERNAL_ERROR_MESSAGE`].
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            _ => INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
