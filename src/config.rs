//! Server configuration: TOML file, then environment, then CLI flags.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::engine::DEFAULT_CODE_ATTEMPTS;
use crate::store::{FileBlob, MemoryStore, RoomStore, SnapshotStore, SqliteStore, StoreError};

/// Which store the server persists rooms in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Rooms live only as long as the process.
    Memory,
    /// One JSON snapshot file for all rooms.
    File {
        /// Snapshot location.
        path: PathBuf,
        /// Longest wait for the snapshot lock.
        #[serde(default = "default_lock_timeout_ms")]
        lock_timeout_ms: u64,
        /// Optimistic attempts per mutation.
        #[serde(default = "default_max_attempts")]
        max_attempts: usize,
    },
    /// SQLite database file.
    Sqlite {
        /// Database path or URL.
        database_url: String,
        /// Longest wait for the database write lock.
        #[serde(default = "default_busy_timeout_ms")]
        busy_timeout_ms: u64,
    },
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Memory
    }
}

impl BackendConfig {
    /// Opens the configured store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend cannot be reached; the server
    /// must not start in that case.
    #[instrument(skip(self))]
    pub fn open(&self) -> Result<Arc<dyn RoomStore>, StoreError> {
        let store: Arc<dyn RoomStore> = match self {
            BackendConfig::Memory => Arc::new(MemoryStore::new()),
            BackendConfig::File {
                path,
                lock_timeout_ms,
                max_attempts,
            } => {
                let blob = FileBlob::open(path, Duration::from_millis(*lock_timeout_ms))?;
                Arc::new(SnapshotStore::new(blob).with_max_attempts(*max_attempts))
            }
            BackendConfig::Sqlite {
                database_url,
                busy_timeout_ms,
            } => Arc::new(SqliteStore::open(
                database_url.clone(),
                Duration::from_millis(*busy_timeout_ms),
            )?),
        };
        info!(backend = store.backend(), "Room store opened");
        Ok(store)
    }
}

#[instrument]
fn default_lock_timeout_ms() -> u64 {
    2_000
}

#[instrument]
fn default_max_attempts() -> usize {
    crate::store::DEFAULT_MAX_ATTEMPTS
}

#[instrument]
fn default_busy_timeout_ms() -> u64 {
    5_000
}

#[instrument]
fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[instrument]
fn default_port() -> u16 {
    3000
}

#[instrument]
fn default_code_attempts() -> usize {
    DEFAULT_CODE_ATTEMPTS
}

/// Lobby server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct LobbyConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    port: u16,

    /// Random codes tried per room creation.
    #[serde(default = "default_code_attempts")]
    code_attempts: usize,

    /// Room store.
    #[serde(default)]
    backend: BackendConfig,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            code_attempts: default_code_attempts(),
            backend: BackendConfig::default(),
        }
    }
}

impl LobbyConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        info!(host = %config.host, port = config.port, "Config loaded successfully");
        Ok(config)
    }

    /// Applies `LOBBY_*` and `DATABASE_URL` overrides read through `var`.
    ///
    /// - `LOBBY_HOST`, `LOBBY_PORT`
    /// - `LOBBY_BACKEND`: `memory`, `file` or `sqlite`
    /// - `LOBBY_DATA_PATH`: snapshot path for the file backend
    /// - `DATABASE_URL`: database for the sqlite backend
    #[instrument(skip(self, var))]
    pub fn apply_env(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(host) = var("LOBBY_HOST") {
            self.host = host;
        }
        if let Some(port) = var("LOBBY_PORT") {
            self.port = port
                .parse()
                .map_err(|_| ConfigError::new(format!("LOBBY_PORT is not a port: '{}'", port)))?;
        }
        if let Some(kind) = var("LOBBY_BACKEND") {
            self.backend = match kind.as_str() {
                "memory" => BackendConfig::Memory,
                "file" => BackendConfig::File {
                    path: var("LOBBY_DATA_PATH")
                        .map(PathBuf::from)
                        .ok_or_else(|| ConfigError::new("LOBBY_BACKEND=file requires LOBBY_DATA_PATH"))?,
                    lock_timeout_ms: default_lock_timeout_ms(),
                    max_attempts: default_max_attempts(),
                },
                "sqlite" => BackendConfig::Sqlite {
                    database_url: var("DATABASE_URL")
                        .ok_or_else(|| ConfigError::new("LOBBY_BACKEND=sqlite requires DATABASE_URL"))?,
                    busy_timeout_ms: default_busy_timeout_ms(),
                },
                other => {
                    return Err(ConfigError::new(format!("Unknown LOBBY_BACKEND '{}'", other)));
                }
            };
        }
        debug!(backend = ?self.backend, "Environment overrides applied");
        Ok(self)
    }

    /// Applies overrides from the process environment.
    pub fn with_process_env(self) -> Result<Self, ConfigError> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Overrides the bind address.
    pub fn with_bind(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }

    /// Overrides the backend.
    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
