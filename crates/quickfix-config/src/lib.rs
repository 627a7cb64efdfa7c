//! Shared configuration for the quickfix diagnostic gateway.
//!
//! Values are layered by `ortho_config`: built-in defaults, then a
//! configuration file, then `QUICKFIX_*` environment variables, then CLI
//! flags. Hosts embedding the gateway load without their own argv, since
//! those flags belong to the host rather than the gateway.

mod defaults;
mod logging;
mod socket;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_CONNECTIONS, DEFAULT_READ_TIMEOUT_MS,
    DEFAULT_TCP_PORT, default_log_filter, default_log_filter_string, default_log_format,
    default_max_body_bytes, default_max_connections, default_read_timeout_ms,
    default_socket_endpoint,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{
    SocketEndpoint, SocketParseError, SocketPreparationError, deserialize_endpoint,
};

/// Gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "QUICKFIX")]
pub struct Config {
    /// Socket the gateway listens on.
    #[serde(
        default = "default_socket_endpoint",
        deserialize_with = "deserialize_endpoint"
    )]
    pub listen_socket: SocketEndpoint,
    /// Time allowed to receive one complete request, in milliseconds.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Connections served at once; further clients wait in the backlog.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Largest request body accepted, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// `tracing` filter directive, for example `info,quickfix=debug`.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Output format of the log subscriber.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_socket: default_socket_endpoint(),
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Endpoint the listener binds.
    #[must_use]
    pub fn listen_socket(&self) -> &SocketEndpoint {
        &self.listen_socket
    }

    /// Deadline for receiving a request on an accepted connection.
    ///
    /// A zero value is clamped to one millisecond because the standard
    /// library rejects zero timeouts.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms.max(1))
    }

    /// Connections served at once, never less than one.
    #[must_use]
    pub fn max_connections(&self) -> usize {
        self.max_connections.max(1)
    }

    /// Largest request body accepted, in bytes.
    #[must_use]
    pub const fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Log filter directive.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
