/*!
 * Configuration
 * Socket-layer limits and sample-service settings
 *
 * Values come from defaults, a JSON file, or environment overrides:
 * - KSOCKET_MAX_HANDLES: handle-table capacity
 * - KSOCKET_MAX_BACKLOG: listen backlog clamp
 * - KSOCKET_NONBLOCKING: default mode for new handles (1/true)
 */

use crate::core::limits::{
    ACCEPT_RETRY_DELAY, DEFAULT_MAX_HANDLES, SOMAXCONN, TCP_RECV_BUFFER, TCP_SERVER_BACKLOG,
    TCP_SERVER_PORT, UDP_ACK_MESSAGE, UDP_CLIENT_POLL, UDP_CLIENT_TIMEOUT, UDP_RECV_BUFFER,
    UDP_SERVER_POLL, UDP_SERVER_PORT,
};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Socket-layer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketConfig {
    /// Handle-table capacity
    pub max_handles: usize,
    /// Largest backlog `listen` passes to the stack
    pub max_backlog: i32,
    /// Whether new handles start in non-blocking mode
    pub nonblocking: bool,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            max_handles: DEFAULT_MAX_HANDLES,
            max_backlog: SOMAXCONN,
            nonblocking: false,
        }
    }
}

impl SocketConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load from a JSON file, then apply environment overrides
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&text)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_handles(mut self, max_handles: usize) -> Self {
        self.max_handles = max_handles;
        self
    }

    pub fn with_max_backlog(mut self, max_backlog: i32) -> Self {
        self.max_backlog = max_backlog;
        self
    }

    pub fn with_nonblocking(mut self, nonblocking: bool) -> Self {
        self.nonblocking = nonblocking;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_handles == 0 {
            return Err(ConfigError::Invalid("max_handles must be non-zero".into()));
        }
        if self.max_backlog <= 0 {
            return Err(ConfigError::Invalid("max_backlog must be positive".into()));
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = env_parse::<usize>("KSOCKET_MAX_HANDLES")? {
            self.max_handles = value;
        }
        if let Some(value) = env_parse::<i32>("KSOCKET_MAX_BACKLOG")? {
            self.max_backlog = value;
        }
        if let Ok(value) = std::env::var("KSOCKET_NONBLOCKING") {
            self.nonblocking = value == "1" || value.eq_ignore_ascii_case("true");
        }
        self.validate()
    }
}

fn env_parse<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { key, value }),
        Err(_) => Ok(None),
    }
}

/// Sample TCP server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpServerConfig {
    pub bind: SocketAddr,
    pub backlog: i32,
    pub recv_buffer: usize,
    /// Back-off after a transient accept failure
    pub retry_delay: Duration,
    /// Receive timeout applied to each accepted client
    pub client_timeout: Option<Duration>,
}

impl Default for TcpServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, TCP_SERVER_PORT)),
            backlog: TCP_SERVER_BACKLOG,
            recv_buffer: TCP_RECV_BUFFER,
            retry_delay: ACCEPT_RETRY_DELAY,
            client_timeout: Some(Duration::from_secs(5)),
        }
    }
}

/// Sample UDP echo server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpServerConfig {
    pub bind: SocketAddr,
    pub recv_buffer: usize,
    pub reply: String,
    /// How often the receive loop wakes to check for a stop request
    pub poll_interval: Duration,
}

impl Default for UdpServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, UDP_SERVER_PORT)),
            recv_buffer: UDP_RECV_BUFFER,
            reply: UDP_ACK_MESSAGE.to_string(),
            poll_interval: UDP_SERVER_POLL,
        }
    }
}

/// Sample UDP client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpClientConfig {
    pub server: SocketAddr,
    pub recv_buffer: usize,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for UdpClientConfig {
    fn default() -> Self {
        Self {
            server: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, UDP_SERVER_PORT)),
            recv_buffer: UDP_RECV_BUFFER,
            timeout: UDP_CLIENT_TIMEOUT,
            poll_interval: UDP_CLIENT_POLL,
        }
    }
}
