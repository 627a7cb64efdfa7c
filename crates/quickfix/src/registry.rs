//! Registry of live inspectable objects and their type descriptors.
//!
//! The hosting application fills a [`RegistryBuilder`] at start-up and
//! freezes it into a [`Registry`], which is then shared read-only by every
//! connection thread. Two seams are exposed as traits so that resolution can
//! be backed by another source: [`ServiceLookup`] for live instances and
//! [`TypeResolver`] for type descriptors.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::reflect::{Instance, TypeDescriptor};

/// A live object paired with its descriptor, cloned out for one request.
#[derive(Clone)]
pub struct ResolvedTarget {
    instance: Instance,
    descriptor: Arc<TypeDescriptor>,
}

impl ResolvedTarget {
    /// Pairs an instance with its descriptor.
    #[must_use]
    pub const fn new(instance: Instance, descriptor: Arc<TypeDescriptor>) -> Self {
        Self {
            instance,
            descriptor,
        }
    }

    /// The live object.
    #[must_use]
    pub const fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Descriptor of the object's type.
    #[must_use]
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Fully qualified type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        self.descriptor.name()
    }
}

impl fmt::Debug for ResolvedTarget {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ResolvedTarget")
            .field("type_name", &self.type_name())
            .finish_non_exhaustive()
    }
}

/// Source of live instances.
pub trait ServiceLookup: Send + Sync {
    /// Finds the instance registered under a short logical `name`.
    fn lookup_by_name(&self, name: &str) -> Option<ResolvedTarget>;

    /// Finds the single live instance whose type is `type_name`.
    ///
    /// # Errors
    ///
    /// Returns [`AmbiguousService`] when more than one instance has the type.
    fn lookup_by_type(&self, type_name: &str) -> Result<Option<ResolvedTarget>, AmbiguousService>;
}

/// Maps fully qualified type names to descriptors.
pub trait TypeResolver: Send + Sync {
    /// Loads the descriptor for `type_name`.
    ///
    /// # Errors
    ///
    /// Returns [`TypeResolutionError`] when the type is unknown.
    fn resolve(&self, type_name: &str) -> Result<Arc<TypeDescriptor>, TypeResolutionError>;
}

/// More than one live instance has the requested type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{count} live instances of {type_name}")]
pub struct AmbiguousService {
    /// Requested type.
    pub type_name: String,
    /// Number of matching instances.
    pub count: usize,
}

/// Raised when a type name cannot be resolved.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeResolutionError {
    /// No descriptor is registered under the name.
    #[error("unknown type: {type_name}")]
    UnknownType {
        /// Requested type name.
        type_name: String,
    },
}

impl TypeResolutionError {
    /// Creates an unknown type error.
    pub fn unknown_type(type_name: impl Into<String>) -> Self {
        Self::UnknownType {
            type_name: type_name.into(),
        }
    }
}

/// Raised while filling a [`RegistryBuilder`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A descriptor with this name is already registered.
    #[error("type '{type_name}' is already registered")]
    DuplicateType {
        /// Conflicting type name.
        type_name: String,
    },
    /// A service with this name is already registered.
    #[error("service '{name}' is already registered")]
    DuplicateService {
        /// Conflicting service name.
        name: String,
    },
    /// The service refers to a type with no registered descriptor.
    #[error("service '{name}' refers to unregistered type '{type_name}'")]
    UnknownType {
        /// Service name.
        name: String,
        /// Missing type name.
        type_name: String,
    },
    /// The instance is not of the type its descriptor describes.
    #[error("service '{name}' is not an instance of '{type_name}'")]
    TypeMismatch {
        /// Service name.
        name: String,
        /// Declared type name.
        type_name: String,
    },
    /// Service and type names must not be blank.
    #[error("registry names must not be empty")]
    EmptyName,
}

/// Collects descriptors and services before traffic begins.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    types: BTreeMap<String, Arc<TypeDescriptor>>,
    services: BTreeMap<String, ResolvedTarget>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the name is blank or already taken.
    pub fn register_type(
        &mut self,
        descriptor: TypeDescriptor,
    ) -> Result<&mut Self, RegistryError> {
        let type_name = descriptor.name().to_owned();
        if type_name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.types.contains_key(&type_name) {
            return Err(RegistryError::DuplicateType { type_name });
        }
        self.types.insert(type_name, Arc::new(descriptor));
        Ok(self)
    }

    /// Registers `instance` under `name` as an object of `type_name`.
    ///
    /// # Errors
    ///
    /// See [`RegistryBuilder::register_shared`].
    pub fn register_service<T>(
        &mut self,
        name: &str,
        type_name: &str,
        instance: T,
    ) -> Result<&mut Self, RegistryError>
    where
        T: Any + Send + Sync,
    {
        self.register_shared(name, type_name, Arc::new(instance))
    }

    /// Registers an already shared instance under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the name is blank or taken, the type
    /// is not registered, or the instance is of a different type.
    pub fn register_shared(
        &mut self,
        name: &str,
        type_name: &str,
        instance: Instance,
    ) -> Result<&mut Self, RegistryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.services.contains_key(name) {
            return Err(RegistryError::DuplicateService {
                name: name.to_owned(),
            });
        }
        let descriptor = self
            .types
            .get(type_name.trim())
            .ok_or_else(|| RegistryError::UnknownType {
                name: name.to_owned(),
                type_name: type_name.to_owned(),
            })?;
        if !descriptor.matches_instance(&instance) {
            return Err(RegistryError::TypeMismatch {
                name: name.to_owned(),
                type_name: type_name.to_owned(),
            });
        }
        let target = ResolvedTarget::new(instance, Arc::clone(descriptor));
        self.services.insert(name.to_owned(), target);
        Ok(self)
    }

    /// Freezes the registry.
    #[must_use]
    pub fn build(self) -> Registry {
        Registry {
            types: self.types,
            services: self.services,
        }
    }
}

/// Immutable registry shared by all connections.
#[derive(Debug, Default)]
pub struct Registry {
    types: BTreeMap<String, Arc<TypeDescriptor>>,
    services: BTreeMap<String, ResolvedTarget>,
}

impl Registry {
    /// Starts a new builder.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Names of registered services.
    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    /// Names of registered types.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

impl ServiceLookup for Registry {
    fn lookup_by_name(&self, name: &str) -> Option<ResolvedTarget> {
        self.services.get(name).cloned()
    }

    fn lookup_by_type(&self, type_name: &str) -> Result<Option<ResolvedTarget>, AmbiguousService> {
        let mut matches = self
            .services
            .values()
            .filter(|target| target.type_name() == type_name);
        let Some(first) = matches.next() else {
            return Ok(None);
        };
        let extra = matches.count();
        if extra > 0 {
            return Err(AmbiguousService {
                type_name: type_name.to_owned(),
                count: extra + 1,
            });
        }
        Ok(Some(first.clone()))
    }
}

impl TypeResolver for Registry {
    fn resolve(&self, type_name: &str) -> Result<Arc<TypeDescriptor>, TypeResolutionError> {
        self.types
            .get(type_name)
            .cloned()
            .ok_or_else(|| TypeResolutionError::unknown_type(type_name))
    }
}
