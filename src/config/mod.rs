//! Configuration management for the school directory
//!
//! Settings are read once at startup, either from environment variables or
//! from a TOML file, then validated before anything is built from them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Datastore configuration
    pub database: DatabaseConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Listening port
    pub port: u16,

    /// Enable permissive CORS
    pub enable_cors: bool,

    /// Enable per-request tracing
    pub enable_request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 3000,
            enable_cors: true,
            enable_request_logging: true,
        }
    }
}

/// Which datastore backs the school table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Sqlite,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(ConfigError::invalid(
                "backend",
                format!("unknown backend '{other}', expected postgres or sqlite"),
            )),
        }
    }
}

/// Datastore configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Store implementation
    pub backend: StoreBackend,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Login role; empty means the driver default
    pub user: String,

    /// Login password
    pub password: Option<String>,

    /// Database name
    pub name: String,

    /// Maximum pooled connections
    pub pool_size: usize,

    /// Timeout for opening a new connection, in seconds
    pub connect_timeout_secs: u64,

    /// Timeout for checking a connection out of the pool, in seconds
    pub acquire_timeout_secs: u64,

    /// Require TLS to the server
    pub use_tls: bool,

    /// Database file for the SQLite backend
    pub sqlite_path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Postgres,
            host: String::from("localhost"),
            port: 5432,
            user: String::new(),
            password: None,
            name: String::from("schools"),
            pool_size: 5,
            connect_timeout_secs: 60,
            acquire_timeout_secs: 60,
            use_tls: false,
            sqlite_path: PathBuf::from("data/schools.db"),
        }
    }
}

impl DatabaseConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

// Keeps the password out of logs
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("name", &self.name)
            .field("pool_size", &self.pool_size)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("use_tls", &self.use_tls)
            .field("sqlite_path", &self.sqlite_path)
            .finish()
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::invalid(
                "format",
                format!("unknown log format '{other}', expected text or json"),
            )),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Unset keys fall back to defaults; set but unparsable keys are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let server = ServerConfig {
            host: get("HOST").unwrap_or(defaults.server.host),
            port: parse_var(&get, "PORT", defaults.server.port)?,
            enable_cors: parse_bool(&get, "ENABLE_CORS", defaults.server.enable_cors)?,
            enable_request_logging: parse_bool(
                &get,
                "ENABLE_REQUEST_LOGGING",
                defaults.server.enable_request_logging,
            )?,
        };

        let db = defaults.database;
        let database = DatabaseConfig {
            backend: parse_var(&get, "DB_BACKEND", db.backend)?,
            host: get("DB_HOST").unwrap_or(db.host),
            port: parse_var(&get, "DB_PORT", db.port)?,
            user: get("DB_USER").unwrap_or(db.user),
            password: lookup("DB_PASSWORD").or(db.password),
            name: get("DB_NAME").unwrap_or(db.name),
            pool_size: parse_var(&get, "DB_POOL_SIZE", db.pool_size)?,
            connect_timeout_secs: parse_var(&get, "DB_CONNECT_TIMEOUT", db.connect_timeout_secs)?,
            acquire_timeout_secs: parse_var(&get, "DB_ACQUIRE_TIMEOUT", db.acquire_timeout_secs)?,
            use_tls: parse_bool(&get, "DB_USE_TLS", db.use_tls)?,
            sqlite_path: get("SQLITE_PATH").map(PathBuf::from).unwrap_or(db.sqlite_path),
        };

        let logging = LoggingConfig {
            level: get("LOG_LEVEL").unwrap_or(defaults.logging.level),
            format: parse_var(&get, "LOG_FORMAT", defaults.logging.format)?,
        };

        Ok(Self {
            server,
            database,
            logging,
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port", "must be greater than 0"));
        }

        let db = &self.database;

        if db.pool_size == 0 {
            return Err(ConfigError::invalid("database.pool_size", "must be greater than 0"));
        }

        if db.connect_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "database.connect_timeout_secs",
                "must be greater than 0",
            ));
        }

        if db.acquire_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "database.acquire_timeout_secs",
                "must be greater than 0",
            ));
        }

        if db.backend == StoreBackend::Postgres {
            if db.name.trim().is_empty() {
                return Err(ConfigError::invalid("database.name", "must not be empty"));
            }

            // Only the plaintext connector is linked in.
            if db.use_tls {
                return Err(ConfigError::invalid(
                    "database.use_tls",
                    "TLS connections are not supported by this build",
                ));
            }
        }

        Ok(())
    }
}

fn parse_var<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::invalid(key, format!("'{raw}': {e}"))),
        None => Ok(default),
    }
}

fn parse_bool<G>(get: &G, key: &str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::invalid(key, format!("'{v}' is not a boolean"))),
        },
        None => Ok(default),
    }
}
