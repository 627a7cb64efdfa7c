//! Built-in configuration defaults.

use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

/// Loopback port used when no socket is configured.
pub const DEFAULT_TCP_PORT: u16 = 9787;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default time allowed to receive one complete request, in milliseconds.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 5_000;

/// Default number of connections served at once.
pub const DEFAULT_MAX_CONNECTIONS: usize = 64;

/// Default upper bound on a request body.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Default log filter expression.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter, for serde defaults.
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default log output format.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Loopback TCP endpoint on [`DEFAULT_TCP_PORT`].
#[must_use]
pub fn default_socket_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", DEFAULT_TCP_PORT)
}

/// Default read timeout, for serde defaults.
#[must_use]
pub const fn default_read_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT_MS
}

/// Default body limit, for serde defaults.
#[must_use]
pub const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Default connection cap, for serde defaults.
#[must_use]
pub const fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}
