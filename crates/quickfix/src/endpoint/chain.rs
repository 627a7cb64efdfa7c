//! Priority-ordered handler chain.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::descriptor::RequestDescriptor;

use super::{ENDPOINT_TARGET, EndpointHandler};

struct Entry {
    priority: i32,
    handler: Arc<dyn EndpointHandler>,
}

/// Collects handlers before traffic begins.
#[derive(Default)]
pub struct EndpointChainBuilder {
    handlers: Vec<Arc<dyn EndpointHandler>>,
}

impl EndpointChainBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler. Registration order breaks priority ties.
    pub fn register<H>(&mut self, handler: H) -> &mut Self
    where
        H: EndpointHandler + 'static,
    {
        self.register_shared(Arc::new(handler))
    }

    /// Appends an already shared handler.
    pub fn register_shared(&mut self, handler: Arc<dyn EndpointHandler>) -> &mut Self {
        self.handlers.push(handler);
        self
    }

    /// Freezes the chain, ordering handlers by ascending priority.
    ///
    /// Priorities are read once here; the sort is stable so equal priorities
    /// keep registration order.
    #[must_use]
    pub fn build(self) -> EndpointChain {
        let mut entries: Vec<Entry> = self
            .handlers
            .into_iter()
            .map(|handler| Entry {
                priority: handler.priority(),
                handler,
            })
            .collect();
        entries.sort_by_key(|entry| entry.priority);
        EndpointChain { entries }
    }
}

impl fmt::Debug for EndpointChainBuilder {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("EndpointChainBuilder")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Immutable, priority-ordered set of handlers.
#[derive(Default)]
pub struct EndpointChain {
    entries: Vec<Entry>,
}

impl EndpointChain {
    /// Starts a new builder.
    #[must_use]
    pub fn builder() -> EndpointChainBuilder {
        EndpointChainBuilder::new()
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The handler that answers `descriptor`, if any is enabled.
    #[must_use]
    pub fn select(&self, descriptor: &RequestDescriptor) -> Option<&dyn EndpointHandler> {
        self.entries
            .iter()
            .find(|entry| entry.handler.enable(descriptor))
            .map(|entry| entry.handler.as_ref())
    }

    /// Runs the selected handler, or describes why none applied.
    #[must_use]
    pub fn dispatch(&self, descriptor: &RequestDescriptor) -> String {
        let Some(handler) = self.select(descriptor) else {
            debug!(
                target: ENDPOINT_TARGET,
                type_hint = descriptor.type_hint(),
                "no endpoint enabled"
            );
            return no_endpoint_message(descriptor);
        };
        debug!(
            target: ENDPOINT_TARGET,
            type_tag = handler.type_tag(),
            priority = handler.priority(),
            "endpoint selected"
        );
        handler.call(descriptor)
    }
}

impl fmt::Debug for EndpointChain {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ranked: Vec<_> = self
            .entries
            .iter()
            .map(|entry| (entry.handler.type_tag(), entry.priority))
            .collect();
        formatter
            .debug_struct("EndpointChain")
            .field("entries", &ranked)
            .finish()
    }
}

fn no_endpoint_message(descriptor: &RequestDescriptor) -> String {
    match descriptor.type_hint() {
        Some(hint) => format!("error: no endpoint accepts type '{hint}'"),
        None => String::from("error: no endpoint registered"),
    }
}
