//! Socket listener for gateway endpoints.
//!
//! The transport binds the configured TCP or Unix endpoint and accepts
//! connections on a background thread, handing each one to a
//! [`ConnectionHandler`] on its own thread, up to a connection limit.

mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod listener_tests;
#[cfg(test)]
mod test_utils;

pub use self::errors::ListenerError;
pub use self::handler::{ConnectionHandler, ConnectionStream};
pub use self::listener::{DEFAULT_CONNECTION_LIMIT, ListenerHandle, SocketListener};
#[cfg(test)]
pub(crate) use self::test_utils::SessionRecorder;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
