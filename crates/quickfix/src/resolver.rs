//! Server identifier resolution.
//!
//! An identifier without a `.` is a short logical name and is looked up by
//! name only. An identifier containing a `.` is a fully qualified type name:
//! the type is resolved first and the single live instance of that type is
//! returned, even when a service happens to be registered under the same
//! dotted name.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::registry::{Registry, ResolvedTarget, ServiceLookup, TypeResolver};

const RESOLVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::resolver");

/// Raised when an identifier does not lead to a live object.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// Nothing matched the identifier.
    #[error("server not found: {server} ({reason})")]
    ServerNotFound {
        /// Identifier as requested.
        server: String,
        /// Why resolution failed.
        reason: String,
    },
}

impl ResolveError {
    /// Creates a server-not-found error.
    pub fn server_not_found(server: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ServerNotFound {
            server: server.into(),
            reason: reason.into(),
        }
    }
}

/// Maps server identifiers to live targets.
#[derive(Clone)]
pub struct ServiceResolver {
    services: Arc<dyn ServiceLookup>,
    types: Arc<dyn TypeResolver>,
}

impl ServiceResolver {
    /// Builds a resolver over separate instance and type sources.
    #[must_use]
    pub fn new(services: Arc<dyn ServiceLookup>, types: Arc<dyn TypeResolver>) -> Self {
        Self { services, types }
    }

    /// Builds a resolver backed by one registry for both roles.
    #[must_use]
    pub fn from_registry(registry: Arc<Registry>) -> Self {
        let services: Arc<dyn ServiceLookup> = registry.clone();
        let types: Arc<dyn TypeResolver> = registry;
        Self::new(services, types)
    }

    /// Resolves `server_id` to a live target.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::ServerNotFound`] when no instance matches,
    /// when the type cannot be loaded, or when several instances share the
    /// resolved type.
    pub fn resolve(&self, server_id: &str) -> Result<ResolvedTarget, ResolveError> {
        let id = server_id.trim();
        if id.contains('.') {
            self.resolve_by_type(id)
        } else {
            self.resolve_by_name(id)
        }
    }

    fn resolve_by_name(&self, name: &str) -> Result<ResolvedTarget, ResolveError> {
        debug!(target: RESOLVER_TARGET, name, "resolving server by name");
        self.services
            .lookup_by_name(name)
            .ok_or_else(|| {
                ResolveError::server_not_found(name, "no service registered under this name")
            })
    }

    fn resolve_by_type(&self, type_name: &str) -> Result<ResolvedTarget, ResolveError> {
        debug!(target: RESOLVER_TARGET, type_name, "resolving server by type");
        let descriptor = self.types.resolve(type_name).map_err(|error| {
            ResolveError::server_not_found(type_name, format!("failed to load server: {error}"))
        })?;
        self.services
            .lookup_by_type(descriptor.name())
            .map_err(|error| ResolveError::server_not_found(type_name, error.to_string()))?
            .ok_or_else(|| {
                ResolveError::server_not_found(type_name, "no live instance of this type")
            })
    }
}

impl std::fmt::Debug for ServiceResolver {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("ServiceResolver").finish_non_exhaustive()
    }
}
