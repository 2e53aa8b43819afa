//! Connection configuration.

use std::time::Duration;

use tokio::sync::Semaphore;

use crate::bee::codec::{DEFAULT_MAX_FRAME_SIZE, MAX_FRAME_SIZE_LIMIT};

/// Default application name sent in the handshake.
pub const DEFAULT_APPLICATION: &str = "bee-client";

/// Default connection URL sent in the handshake.
pub const DEFAULT_URL: &str = "agent://127.0.0.1:6142";

/// Default row buffer capacity per statement.
pub const DEFAULT_ROW_BUFFER_CAPACITY: usize = 1024;

// ============================================================================
// ConnectionConfig
// ============================================================================

/// Settings for one Bee connection.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Handshake reply timeout; `None` means connect timeout + 1s
    pub handshake_timeout: Option<Duration>,
    /// Application name sent in the handshake
    pub application: String,
    /// Connection URL sent in the handshake
    pub url: String,
    /// Statement timeout, sent to the server and used for header waits
    pub statement_timeout: Duration,
    /// Rows buffered per statement before the read task pauses
    pub row_buffer_capacity: usize,
    /// Largest accepted frame payload
    pub max_frame_size: usize,
    /// Keepalive ping interval, disabled when `None`
    pub keep_alive_interval: Option<Duration>,
}

impl ConnectionConfig {
    /// Create a configuration with defaults for `host:port`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: Duration::from_secs(30),
            handshake_timeout: None,
            application: DEFAULT_APPLICATION.to_string(),
            url: DEFAULT_URL.to_string(),
            statement_timeout: Duration::from_secs(5),
            row_buffer_capacity: DEFAULT_ROW_BUFFER_CAPACITY,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            keep_alive_interval: None,
        }
    }

    /// Start a builder.
    pub fn builder(host: impl Into<String>, port: u16) -> ConnectionConfigBuilder {
        ConnectionConfigBuilder {
            config: Self::new(host, port),
        }
    }

    /// `host:port` socket address string.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Effective handshake timeout.
    pub fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout
            .unwrap_or(self.connect_timeout + Duration::from_secs(1))
    }

    /// Statement timeout in whole seconds, as sent on the wire.
    pub fn statement_timeout_secs(&self) -> u32 {
        u32::try_from(self.statement_timeout.as_secs()).unwrap_or(u32::MAX)
    }
}

// ============================================================================
// ConnectionConfigBuilder
// ============================================================================

/// Builder for [`ConnectionConfig`].
#[derive(Debug, Clone)]
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    /// Set the TCP connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the handshake reply timeout.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = Some(timeout);
        self
    }

    /// Set the application name.
    pub fn with_application(mut self, application: impl Into<String>) -> Self {
        self.config.application = application.into();
        self
    }

    /// Set the connection URL sent in the handshake.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// Set the statement timeout.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.config.statement_timeout = timeout;
        self
    }

    /// Set the per-statement row buffer capacity (at least 1, at most
    /// [`Semaphore::MAX_PERMITS`]).
    pub fn with_row_buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.row_buffer_capacity = capacity.clamp(1, Semaphore::MAX_PERMITS);
        self
    }

    /// Set the largest accepted frame payload, capped at
    /// [`MAX_FRAME_SIZE_LIMIT`].
    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.config.max_frame_size = size.min(MAX_FRAME_SIZE_LIMIT);
        self
    }

    /// Enable keepalive pings.
    pub fn with_keep_alive_interval(mut self, interval: Duration) -> Self {
        self.config.keep_alive_interval = Some(interval);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ConnectionConfig {
        self.config
    }
}
