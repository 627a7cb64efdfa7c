//! Built-in endpoint answering from the service registry.

use std::sync::Arc;

use tracing::warn;

use crate::descriptor::RequestDescriptor;
use crate::dispatch::{DispatchError, Dispatcher};
use crate::registry::Registry;
use crate::resolver::ServiceResolver;

use super::{DEFAULT_PRIORITY, ENDPOINT_TARGET, EndpointHandler};

/// Type tag of [`RegistryEndpoint`].
pub const SERVICE_TYPE_TAG: &str = "service";

/// Resolves the descriptor's server and dispatches the invocation on it.
#[derive(Debug, Clone)]
pub struct RegistryEndpoint {
    resolver: ServiceResolver,
    dispatcher: Dispatcher,
    priority: i32,
}

impl RegistryEndpoint {
    /// Builds an endpoint from an explicit resolver and dispatcher.
    #[must_use]
    pub const fn new(resolver: ServiceResolver, dispatcher: Dispatcher) -> Self {
        Self {
            resolver,
            dispatcher,
            priority: DEFAULT_PRIORITY,
        }
    }

    /// Builds an endpoint over `registry` with the default expression engine.
    #[must_use]
    pub fn from_registry(registry: Arc<Registry>) -> Self {
        Self::new(ServiceResolver::from_registry(registry), Dispatcher::default())
    }

    /// Overrides the chain priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    fn answer(&self, descriptor: &RequestDescriptor) -> Result<String, DispatchError> {
        let target = self.resolver.resolve(descriptor.server())?;
        self.dispatcher.dispatch(&target, descriptor.invocation())
    }
}

impl EndpointHandler for RegistryEndpoint {
    fn type_tag(&self) -> &str {
        SERVICE_TYPE_TAG
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn call(&self, descriptor: &RequestDescriptor) -> String {
        self.answer(descriptor).unwrap_or_else(|error| {
            warn!(
                target: ENDPOINT_TARGET,
                server = descriptor.server(),
                %error,
                "invocation failed"
            );
            format!("error: {error}")
        })
    }
}
