//! Server configuration.
//!
//! Values come from an optional `waitroom.toml` in the working directory,
//! then from process environment variables, later sources winning:
//!
//! | Variable             | Default   | Meaning                              |
//! |----------------------|-----------|--------------------------------------|
//! | `CAPACITY`           | 1         | visitors admitted at once            |
//! | `SESSION_TTL`        | 180       | seconds a slot lasts without refresh |
//! | `SWEEP_INTERVAL`     | 60        | seconds between expiry sweeps        |
//! | `SWEEP_JITTER`       | 0         | max seconds of first-sweep delay     |
//! | `SWEEP_BATCH_LIMIT`  | 0         | max expiries per sweep, 0 = no limit |
//! | `LOCK_TIMEOUT_MS`    | 5000      | admission lock wait before 503       |
//! | `HOST`               | 0.0.0.0   | interface for both listeners         |
//! | `PORT`               | 3000      | HTTP port                            |
//! | `WS_PORT`            | 3001      | WebSocket port                       |
//! | `HEARTBEAT_INTERVAL` | 25        | seconds between WebSocket pings      |
//! | `LOG_LEVEL`          | info      | default filter when `RUST_LOG` unset |
//! | `LOG_FORMAT`         | pretty    | `pretty` or `json`                   |

use std::time::Duration;

use serde::Deserialize;
use waitroom_admission::AdmissionConfig;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Everything the `waitroom-server` binary can be told.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WaitroomConfig {
    pub capacity: usize,
    /// Seconds.
    pub session_ttl: u64,
    /// Seconds.
    pub sweep_interval: u64,
    /// Seconds.
    pub sweep_jitter: u64,
    pub sweep_batch_limit: usize,
    pub lock_timeout_ms: u64,
    pub host: String,
    pub port: u16,
    pub ws_port: u16,
    /// Seconds.
    pub heartbeat_interval: u64,
    pub log_level: String,
    pub log_format: String,
}

impl Default for WaitroomConfig {
    fn default() -> Self {
        Self {
            capacity: 1,
            session_ttl: 180,
            sweep_interval: 60,
            sweep_jitter: 0,
            sweep_batch_limit: 0,
            lock_timeout_ms: 5_000,
            host: "0.0.0.0".to_string(),
            port: 3000,
            ws_port: 3001,
            heartbeat_interval: 25,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl WaitroomConfig {
    /// Loads `waitroom.toml` (if present) overlaid with the process
    /// environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("waitroom", config::Environment::default())
    }

    /// Loads from a named config file (optional) and an environment source.
    pub fn load_from(file: &str, env: config::Environment) -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(env.try_parsing(true))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// The admission half of the config, clamped to safe values.
    pub fn admission(&self) -> AdmissionConfig {
        AdmissionConfig {
            capacity: self.capacity,
            session_ttl: Duration::from_secs(self.session_ttl),
            sweep_interval: Duration::from_secs(self.sweep_interval),
            sweep_jitter: Duration::from_secs(self.sweep_jitter),
            sweep_batch_limit: self.sweep_batch_limit,
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
        }
        .validated()
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn ws_addr(&self) -> String {
        format!("{}:{}", self.host, self.ws_port)
    }

    /// Ping interval for idle WebSockets, never below one second.
    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval.max(1))
    }
}
