//! In-process diagnostic gateway.
//!
//! An operator sends a small framed request over a local socket naming a
//! live service and either a member to call or an expression to evaluate.
//! The gateway resolves the service from a [`Registry`], runs the call and
//! returns the stringified result, so a long-running process can be
//! inspected without a redeploy.
//!
//! The request pipeline is synchronous and runs once per connection:
//!
//! 1. [`codec`] decodes the request envelope, reading the body strictly by
//!    `Content-Length`.
//! 2. [`descriptor`] parses the JSON body into a [`RequestDescriptor`].
//! 3. The [`EndpointChain`] picks the lowest-priority handler enabled for the
//!    descriptor's type hint.
//! 4. The built-in [`RegistryEndpoint`] resolves the server identifier with
//!    a [`ServiceResolver`] and performs the invocation with a
//!    [`Dispatcher`].
//! 5. The result, or the rendered error, is encoded as a `200 ok` response.
//!
//! Hosts register their services and handlers up front, then call
//! [`bootstrap`] (or [`bootstrap_with`] for custom configuration loading and
//! health reporting) to start the listener.

pub mod codec;
pub mod descriptor;
pub mod dispatch;
pub mod endpoint;
pub mod reflect;
pub mod registry;
pub mod resolver;
pub mod transport;

mod bootstrap;
mod gateway;
mod health;
mod telemetry;

pub use bootstrap::{
    BootstrapError, ConfigLoader, RunningGateway, StaticConfigLoader, SystemConfigLoader,
    bootstrap, bootstrap_with,
};
pub use descriptor::{DescriptorError, Invocation, RequestDescriptor};
pub use dispatch::{DispatchError, Dispatcher, ExpressionEngine, RestrictedExpressionEngine};
pub use endpoint::{EndpointChain, EndpointChainBuilder, EndpointHandler, RegistryEndpoint};
pub use gateway::Gateway;
pub use health::{HealthReporter, StructuredHealthReporter};
pub use quickfix_config::{Config, LogFormat, SocketEndpoint};
pub use registry::{Registry, RegistryBuilder, ResolvedTarget};
pub use resolver::{ResolveError, ServiceResolver};
pub use telemetry::{SubscriberOwner, TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
