//! Global configuration parsing, validation, and environment overrides.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::{AppError, Result};

/// Environment variable overriding [`GlobalConfig::http_port`].
pub const PORT_ENV: &str = "PORT";

/// Environment variable overriding [`GlobalConfig::db_path`].
pub const DB_PATH_ENV: &str = "TRACKLINE_DB_PATH";

/// Per-connection liveness timing, in seconds.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct KeepaliveConfig {
    /// Interval between server-initiated pings.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// Deadline for a single ping to be written.
    #[serde(default = "default_ping_send_timeout")]
    pub ping_send_timeout_seconds: u64,
    /// Maximum silence from the client before the connection is dropped.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_seconds: u64,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            ping_interval_seconds: default_ping_interval(),
            ping_send_timeout_seconds: default_ping_send_timeout(),
            read_timeout_seconds: default_read_timeout(),
        }
    }
}

impl KeepaliveConfig {
    /// Ping interval as a [`Duration`].
    #[must_use]
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_seconds)
    }

    /// Ping send deadline as a [`Duration`].
    #[must_use]
    pub fn ping_send_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_send_timeout_seconds)
    }

    /// Read inactivity deadline as a [`Duration`].
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_seconds)
    }
}

fn default_ping_interval() -> u64 {
    30
}

fn default_ping_send_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    60
}

fn default_http_host() -> String {
    "0.0.0.0".into()
}

fn default_http_port() -> u16 {
    8080
}

fn default_ws_path() -> String {
    "/ws".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data").join("trackline.db")
}

/// Global configuration parsed from `config.toml`.
///
/// Every key is optional; an empty document yields the defaults.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Interface the HTTP server binds to.
    #[serde(default = "default_http_host")]
    pub http_host: String,
    /// HTTP port; `0` lets the OS choose.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Path of the WebSocket upgrade endpoint.
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
    /// `SQLite` database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Liveness probing and read timeout settings.
    #[serde(default)]
    pub keepalive: KeepaliveConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            http_host: default_http_host(),
            http_port: default_http_port(),
            ws_path: default_ws_path(),
            db_path: default_db_path(),
            keepalive: KeepaliveConfig::default(),
        }
    }
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `PORT` and `TRACKLINE_DB_PATH` from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `PORT` is set but not a valid port.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(raw) = env::var(PORT_ENV) {
            self.http_port = raw
                .trim()
                .parse()
                .map_err(|err| AppError::Config(format!("invalid {PORT_ENV} value {raw:?}: {err}")))?;
            info!(port = self.http_port, "http port overridden from environment");
        }

        if let Ok(raw) = env::var(DB_PATH_ENV) {
            if raw.trim().is_empty() {
                return Err(AppError::Config(format!("{DB_PATH_ENV} must not be empty")));
            }
            self.db_path = PathBuf::from(raw);
            info!(db_path = %self.db_path.display(), "database path overridden from environment");
        }

        Ok(())
    }

    /// `host:port` string suitable for binding a listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    fn validate(&self) -> Result<()> {
        if !self.ws_path.starts_with('/') {
            return Err(AppError::Config("ws_path must start with '/'".into()));
        }
        if self.ws_path == "/health" || self.ws_path.starts_with("/sessions/") {
            return Err(AppError::Config(format!(
                "ws_path {:?} collides with a built-in route",
                self.ws_path
            )));
        }

        let keepalive = &self.keepalive;
        if keepalive.ping_interval_seconds == 0
            || keepalive.ping_send_timeout_seconds == 0
            || keepalive.read_timeout_seconds == 0
        {
            return Err(AppError::Config(
                "keepalive timings must be greater than zero".into(),
            ));
        }

        if keepalive.ping_interval_seconds >= keepalive.read_timeout_seconds {
            return Err(AppError::Config(
                "keepalive.ping_interval_seconds must be less than read_timeout_seconds".into(),
            ));
        }

        Ok(())
    }
}
