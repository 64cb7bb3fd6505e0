//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings, used by the SQLite backend.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Record store selection.
    #[serde(default)]
    pub store: StoreConfig,

    /// Request validation settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// SQLite busy timeout, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Which record store backs the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process collection; lost on restart.
    Memory,
    /// The `coches` table in the configured SQLite file.
    #[default]
    Sqlite,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

/// Record store configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Whether to load the seed set on startup. Defaults to `true` for the
    /// memory backend and `false` for SQLite, where seeding only happens
    /// when the table is empty.
    #[serde(default)]
    pub seed: Option<bool>,
}

impl StoreConfig {
    pub fn should_seed(&self) -> bool {
        self.seed.unwrap_or(self.backend == StoreBackend::Memory)
    }
}

/// Request validation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Reject creation bodies without `anio`. When `false`, a missing year is
    /// stored as unknown (`null`).
    #[serde(default = "default_require_anio")]
    pub require_anio: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "coches_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    5000
}

fn default_db_path() -> String {
    "coches.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_require_anio() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            require_anio: default_require_anio(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `COCHES_HOST` overrides `server.host`
/// - `COCHES_PORT` overrides `server.port`
/// - `COCHES_DB_PATH` overrides `database.path`
/// - `COCHES_STORE` overrides `store.backend` ("memory" or "sqlite")
/// - `COCHES_LOG_LEVEL` overrides `logging.level`
/// - `COCHES_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    Ok(apply_env_overrides(config, |key| std::env::var(key).ok()))
}

/// Applies `COCHES_*` overrides read through `lookup`. Values that fail to
/// parse are ignored with a warning.
pub fn apply_env_overrides<F>(mut config: Config, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("COCHES_HOST") {
        match host.parse() {
            Ok(parsed) => config.server.host = parsed,
            Err(_) => tracing::warn!(value = %host, "ignoring invalid COCHES_HOST"),
        }
    }
    if let Some(port) = lookup("COCHES_PORT") {
        match port.parse() {
            Ok(parsed) => config.server.port = parsed,
            Err(_) => tracing::warn!(value = %port, "ignoring invalid COCHES_PORT"),
        }
    }
    if let Some(db_path) = lookup("COCHES_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(backend) = lookup("COCHES_STORE") {
        match backend.parse() {
            Ok(parsed) => config.store.backend = parsed,
            Err(e) => tracing::warn!(error = %e, "ignoring invalid COCHES_STORE"),
        }
    }
    if let Some(level) = lookup("COCHES_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("COCHES_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    config
}
