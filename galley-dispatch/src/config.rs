//! Dispatch configuration
//!
//! # Environment variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | GALLEY_BRIDGE_ADDR | 127.0.0.1:8182 | Bridge agent endpoint |
//! | GALLEY_DATA_DIR | ./galley-data | Station storage directory |
//! | GALLEY_BRIDGE_WAIT_MS | 60000 | Max wait for the bridge to appear |
//! | GALLEY_BRIDGE_POLL_MS | 500 | Bridge probe interval |
//! | GALLEY_CONNECT_TIMEOUT_MS | 10000 | Connect timeout |
//! | GALLEY_REQUEST_TIMEOUT_MS | 10000 | Per-request timeout |
//! | GALLEY_HEARTBEAT_MS | 30000 | Liveness check interval (0 disables) |
//! | GALLEY_RECONNECT_BASE_MS | 1000 | Backoff base delay |
//! | GALLEY_MAX_RECONNECT_ATTEMPTS | 5 | Automatic reconnect cap |
//! | GALLEY_PAPER_WIDTH | 48 | Paper width in columns |
//! | GALLEY_LOG_LEVEL | info | Log level |
//! | GALLEY_LOG_JSON | false | JSON console logs |
//! | GALLEY_LOG_DIR | (unset) | Rolling log file directory |

use std::path::PathBuf;
use std::time::Duration;

/// Connection, heartbeat and reconnection tuning
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Bridge agent endpoint
    pub bridge_addr: String,
    /// Upper bound on waiting for the bridge to appear
    pub bridge_wait: Duration,
    /// Probe interval while waiting for the bridge
    pub bridge_poll_interval: Duration,
    /// Upper bound on a single connection attempt
    pub connect_timeout: Duration,
    /// Upper bound on a single bridge request
    pub request_timeout: Duration,
    /// Liveness check interval (zero disables the heartbeat)
    pub heartbeat_interval: Duration,
    /// Base delay for reconnect backoff
    pub reconnect_base_delay: Duration,
    /// Automatic reconnect attempts before giving up
    pub max_reconnect_attempts: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            bridge_addr: "127.0.0.1:8182".to_string(),
            bridge_wait: Duration::from_secs(60),
            bridge_poll_interval: Duration::from_millis(500),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(30),
            reconnect_base_delay: Duration::from_secs(1),
            max_reconnect_attempts: 5,
        }
    }
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bridge_addr(mut self, addr: impl Into<String>) -> Self {
        self.bridge_addr = addr.into();
        self
    }

    /// Set the bridge wait bound and probe interval
    pub fn with_bridge_wait(mut self, wait: Duration, poll_interval: Duration) -> Self {
        self.bridge_wait = wait;
        self.bridge_poll_interval = poll_interval;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the heartbeat interval (zero disables)
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_reconnect_base_delay(mut self, delay: Duration) -> Self {
        self.reconnect_base_delay = delay;
        self
    }

    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }
}

/// Top-level configuration for the dispatcher and the CLI
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub connection: ConnectionConfig,
    /// Directory holding the station database
    pub data_dir: PathBuf,
    /// Paper width in columns (32 for 58mm, 48 for 80mm)
    pub paper_width: usize,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            data_dir: PathBuf::from("./galley-data"),
            paper_width: 48,
            log_level: "info".to_string(),
            log_json: false,
            log_dir: None,
        }
    }
}

impl DispatchConfig {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable variables fall back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let conn = defaults.connection;

        Self {
            connection: ConnectionConfig {
                bridge_addr: std::env::var("GALLEY_BRIDGE_ADDR").unwrap_or(conn.bridge_addr),
                bridge_wait: env_millis("GALLEY_BRIDGE_WAIT_MS").unwrap_or(conn.bridge_wait),
                bridge_poll_interval: env_millis("GALLEY_BRIDGE_POLL_MS")
                    .unwrap_or(conn.bridge_poll_interval),
                connect_timeout: env_millis("GALLEY_CONNECT_TIMEOUT_MS")
                    .unwrap_or(conn.connect_timeout),
                request_timeout: env_millis("GALLEY_REQUEST_TIMEOUT_MS")
                    .unwrap_or(conn.request_timeout),
                heartbeat_interval: env_millis("GALLEY_HEARTBEAT_MS")
                    .unwrap_or(conn.heartbeat_interval),
                reconnect_base_delay: env_millis("GALLEY_RECONNECT_BASE_MS")
                    .unwrap_or(conn.reconnect_base_delay),
                max_reconnect_attempts: env_parse("GALLEY_MAX_RECONNECT_ATTEMPTS")
                    .unwrap_or(conn.max_reconnect_attempts),
            },
            data_dir: std::env::var("GALLEY_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            paper_width: env_parse("GALLEY_PAPER_WIDTH").unwrap_or(defaults.paper_width),
            log_level: std::env::var("GALLEY_LOG_LEVEL").unwrap_or(defaults.log_level),
            log_json: env_parse("GALLEY_LOG_JSON").unwrap_or(defaults.log_json),
            log_dir: std::env::var("GALLEY_LOG_DIR").ok(),
        }
    }

    /// Path of the station database inside the data directory
    pub fn station_db_path(&self) -> PathBuf {
        self.data_dir.join("stations.redb")
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_millis(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_millis)
}
