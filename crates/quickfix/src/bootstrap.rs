//! Gateway bootstrap orchestration.
//!
//! The host builds its [`EndpointChain`] first, then hands it to
//! [`bootstrap_with`], which loads configuration, installs telemetry,
//! prepares the socket directory and starts the listener. Health events are
//! reported at each step.

use std::ffi::OsString;
use std::net::SocketAddr;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use quickfix_config::{Config, SocketEndpoint, SocketPreparationError};

use crate::endpoint::EndpointChain;
use crate::gateway::Gateway;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::transport::{ListenerError, ListenerHandle, SocketListener};

/// Source of the gateway configuration.
pub trait ConfigLoader: Send + Sync {
    /// Loads the gateway configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader reading defaults, configuration files and `QUICKFIX_*`
/// environment variables.
///
/// The process arguments belong to the host, so they are never parsed as
/// gateway flags.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter([OsString::from(env!("CARGO_PKG_NAME"))])
    }
}

/// Loader returning a configuration the host already holds.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The socket directory could not be prepared.
    #[error("failed to prepare gateway socket: {source}")]
    Socket {
        /// Filesystem error.
        #[source]
        source: SocketPreparationError,
    },
    /// The listener failed to bind or start.
    #[error("failed to start gateway listener: {source}")]
    Listener {
        /// Listener error.
        #[source]
        source: ListenerError,
    },
}

/// A gateway accepting connections on a background thread.
#[derive(Debug)]
pub struct RunningGateway {
    config: Config,
    local_addr: Option<SocketAddr>,
    telemetry: TelemetryHandle,
    listener: ListenerHandle,
}

impl RunningGateway {
    /// The resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The endpoint the listener is bound to.
    #[must_use]
    pub fn endpoint(&self) -> &SocketEndpoint {
        self.config.listen_socket()
    }

    /// Actual TCP address, useful when the configured port was 0.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Telemetry handle, primarily useful in tests.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Stops accepting new connections.
    pub fn shutdown(&self) {
        self.listener.shutdown();
    }

    /// Waits for the accept thread to exit.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::ThreadPanic`] when the accept thread panicked.
    pub fn join(self) -> Result<(), ListenerError> {
        self.listener.join()
    }
}

/// Bootstraps with [`SystemConfigLoader`] and [`StructuredHealthReporter`].
///
/// # Errors
///
/// See [`bootstrap_with`].
pub fn bootstrap(chain: EndpointChain) -> Result<RunningGateway, BootstrapError> {
    bootstrap_with(
        &SystemConfigLoader,
        Arc::new(StructuredHealthReporter::new()),
        chain,
    )
}

/// Bootstraps the gateway using the supplied collaborators.
///
/// # Errors
///
/// Returns the first failing step as a [`BootstrapError`]; the reporter
/// sees the same error before it is returned.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    chain: EndpointChain,
) -> Result<RunningGateway, BootstrapError> {
    reporter.bootstrap_starting();
    match start(loader, reporter.as_ref(), chain) {
        Ok(running) => {
            reporter.bootstrap_succeeded(running.config());
            Ok(running)
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn start(
    loader: &dyn ConfigLoader,
    reporter: &dyn HealthReporter,
    chain: EndpointChain,
) -> Result<RunningGateway, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    config
        .listen_socket()
        .prepare_filesystem()
        .map_err(|source| BootstrapError::Socket { source })?;

    let listener = SocketListener::bind(config.listen_socket())
        .map_err(|source| BootstrapError::Listener { source })?
        .with_connection_limit(config.max_connections());
    let local_addr = listener.local_addr();
    let gateway = Gateway::from_config(Arc::new(chain), &config);
    let listener = listener
        .start(Arc::new(gateway))
        .map_err(|source| BootstrapError::Listener { source })?;
    reporter.listener_started(config.listen_socket(), local_addr);

    Ok(RunningGateway {
        config,
        local_addr,
        telemetry,
        listener,
    })
}
