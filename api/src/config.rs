//! Server configuration module.
//!
//! Every setting can be passed as a command-line flag or through a
//! `ROUTEPULSE_*` environment variable (a `.env` file is loaded first by the
//! binary). Defaults match a local development setup with an in-memory store.

use crate::db::DatabaseConfig;
use clap::{Parser, ValueEnum};
use shared::notify::{DEFAULT_CHANNEL, DEFAULT_EVENT};
use std::net::SocketAddr;
use thiserror::Error;

/// Backend used to persist request events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    /// Process-local store; events are lost on restart.
    Memory,
    /// `ClickHouse` table.
    Clickhouse,
}

/// Errors produced by configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Port zero was requested.
    #[error("port must be between 1 and 65535, got {0}")]
    InvalidPort(u16),

    /// No instrumented path prefixes were configured.
    #[error("at least one capture prefix is required")]
    NoCapturePrefixes,

    /// A capture prefix is not an absolute path.
    #[error("capture prefix must start with '/', got '{0}'")]
    InvalidCapturePrefix(String),

    /// The notification buffer would be empty.
    #[error("notify capacity must be > 0")]
    ZeroNotifyCapacity,
}

/// Server configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "routepulse")]
#[command(author, version, about = "Routepulse - request analytics server", long_about = None)]
pub struct Config {
    /// The host address to bind to.
    #[arg(long, env = "ROUTEPULSE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// The port to listen on.
    #[arg(long, env = "ROUTEPULSE_PORT", default_value_t = 4000)]
    pub port: u16,

    /// Path prefixes whose requests are captured (comma-separated).
    #[arg(
        long = "capture-prefix",
        env = "ROUTEPULSE_CAPTURE_PREFIXES",
        value_delimiter = ',',
        default_value = "/wait"
    )]
    pub capture_prefixes: Vec<String>,

    /// Event store backend.
    #[arg(long, env = "ROUTEPULSE_STORE", value_enum, default_value_t = StoreBackend::Memory)]
    pub store: StoreBackend,

    /// `ClickHouse` URL.
    #[arg(long, env = "ROUTEPULSE_DB_URL", default_value = "http://localhost:8123")]
    pub db_url: String,

    /// `ClickHouse` database name.
    #[arg(long, env = "ROUTEPULSE_DB_NAME", default_value = "routepulse")]
    pub db_name: String,

    /// `ClickHouse` user.
    #[arg(long, env = "ROUTEPULSE_DB_USER", default_value = "default")]
    pub db_user: String,

    /// `ClickHouse` password.
    #[arg(long, env = "ROUTEPULSE_DB_PASSWORD", default_value = "", hide_env_values = true)]
    pub db_password: String,

    /// Channel analytics snapshots are published on.
    #[arg(long, env = "ROUTEPULSE_NOTIFY_CHANNEL", default_value = DEFAULT_CHANNEL)]
    pub notify_channel: String,

    /// Event name carried by snapshot notifications.
    #[arg(long, env = "ROUTEPULSE_NOTIFY_EVENT", default_value = DEFAULT_EVENT)]
    pub notify_event: String,

    /// Snapshots buffered per dashboard subscriber before it starts lagging.
    #[arg(long, env = "ROUTEPULSE_NOTIFY_CAPACITY", default_value_t = 64)]
    pub notify_capacity: usize,

    /// Emit logs as JSON lines.
    #[arg(long, env = "ROUTEPULSE_LOG_JSON")]
    pub log_json: bool,
}

impl Config {
    /// Parses configuration from command-line arguments and environment
    /// variables, then validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be parsed or fails validation.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self::try_parse()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that clap cannot express.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }
        if self.capture_prefixes.is_empty() {
            return Err(ConfigError::NoCapturePrefixes);
        }
        if let Some(prefix) = self.capture_prefixes.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::InvalidCapturePrefix(prefix.clone()));
        }
        if self.notify_capacity == 0 {
            return Err(ConfigError::ZeroNotifyCapacity);
        }
        Ok(())
    }

    /// Returns the socket address for binding.
    ///
    /// # Panics
    ///
    /// Panics if the host and port combination cannot be parsed as a valid socket address.
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Invalid socket address from config")
    }

    /// Returns the `ClickHouse` connection settings.
    #[must_use]
    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.db_url.clone(),
            database: self.db_name.clone(),
            user: self.db_user.clone(),
            password: self.db_password.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            capture_prefixes: vec!["/wait".to_string()],
            store: StoreBackend::Memory,
            db_url: "http://localhost:8123".to_string(),
            db_name: "routepulse".to_string(),
            db_user: "default".to_string(),
            db_password: String::new(),
            notify_channel: DEFAULT_CHANNEL.to_string(),
            notify_event: DEFAULT_EVENT.to_string(),
            notify_capacity: 64,
            log_json: false,
        }
    }
}
