//! HTTP server lifecycle
//!
//! Builds the store, wires it into [`AppState`], and serves the API until a
//! shutdown signal arrives.

use axum::Router;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{Config, ConfigError, DatabaseConfig, ServerConfig};
use crate::storage::{open_store, SharedSchoolStore, StoreError};

use super::api::create_router;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
///
/// Cloned into every handler; the store handle is the only shared resource.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedSchoolStore,
}

impl AppState {
    pub fn new(store: SharedSchoolStore) -> Self {
        Self { store }
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Startup and serving failures; all of them are fatal
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to initialize {backend} store: {source}")]
    Init {
        backend: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Open the configured store, check it is reachable, and create the schema
pub async fn init_store(config: &DatabaseConfig) -> Result<SharedSchoolStore, ServerError> {
    let store = open_store(config).map_err(|source| ServerError::Init {
        backend: config.backend.as_str(),
        source,
    })?;

    let backend = store.backend();
    let init_err = |source| ServerError::Init { backend, source };

    store.ping().await.map_err(init_err)?;
    tracing::info!(backend, "Database connected successfully");

    store.create_table().await.map_err(init_err)?;

    Ok(store)
}

// ============================================================================
// School Server
// ============================================================================

/// Main HTTP server
pub struct SchoolServer {
    config: ServerConfig,
    state: AppState,
}

impl SchoolServer {
    /// Create a server around an already initialized store
    pub fn new(config: ServerConfig, store: SharedSchoolStore) -> Self {
        Self {
            config,
            state: AppState::new(store),
        }
    }

    /// Validate configuration and initialize the store
    pub async fn bootstrap(config: &Config) -> Result<Self, ServerError> {
        config.validate()?;
        let store = init_store(&config.database).await?;
        Ok(Self::new(config.server.clone(), store))
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.config.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Serve until `shutdown_signal` resolves
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let listener = tokio::net::TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;

        tracing::info!(
            %addr,
            backend = self.state.store.backend(),
            "Server is running"
        );
        tracing::info!("API endpoints:");
        tracing::info!("   - POST http://{addr}/api/addSchool");
        tracing::info!("   - GET  http://{addr}/api/listSchools");
        tracing::info!("   - GET  http://{addr}/health");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(ServerError::Serve)?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

// ============================================================================
// Tests
// ============================================================================
