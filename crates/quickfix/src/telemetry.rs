//! Process-wide tracing subscriber installation.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use quickfix_config::{Config, LogFormat};

static TELEMETRY_GUARD: OnceCell<SubscriberOwner> = OnceCell::new();

/// Who owns the process-wide subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberOwner {
    /// The gateway installed its own subscriber.
    Gateway,
    /// The host had already installed one; gateway events flow into it.
    Host,
}

/// Records how telemetry was set up.
#[derive(Debug, Clone, Copy)]
pub struct TelemetryHandle {
    owner: SubscriberOwner,
}

impl TelemetryHandle {
    /// Owner of the global subscriber.
    #[must_use]
    pub const fn owner(self) -> SubscriberOwner {
        self.owner
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter directive did not parse.
    #[error("invalid log filter: {0}")]
    Filter(String),
}

/// Installs the global subscriber on the first call, unless the host
/// already installed one.
///
/// Later calls return the first outcome without touching global state, so a
/// host that bootstraps the gateway twice keeps its first filter and format.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when the filter is invalid.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config))
        .map(|owner| TelemetryHandle { owner: *owner })
}

fn install_subscriber(config: &Config) -> Result<SubscriberOwner, TelemetryError> {
    let filter = EnvFilter::try_new(config.log_filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;
    if tracing::dispatcher::has_been_set() {
        return Ok(SubscriberOwner::Host);
    }

    let builder = |filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(true)
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .with_timer(fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format() {
        LogFormat::Json => Box::new(builder(filter).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter).compact().finish()),
    };

    // Losing a race with the host leaves the host's subscriber in charge.
    match tracing::subscriber::set_global_default(subscriber) {
        Ok(()) => Ok(SubscriberOwner::Gateway),
        Err(_) => Ok(SubscriberOwner::Host),
    }
}
