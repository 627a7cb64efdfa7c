//! Pluggable endpoint handlers and the priority chain that selects one.
//!
//! Each handler declares a type tag and a priority. A descriptor enables a
//! handler when its type hint is absent or names the handler's tag; among the
//! enabled handlers the lowest priority wins and ties go to the handler that
//! was registered first.

mod chain;
mod service;

use crate::descriptor::RequestDescriptor;

pub use self::chain::{EndpointChain, EndpointChainBuilder};
pub use self::service::{RegistryEndpoint, SERVICE_TYPE_TAG};

/// Priority given to handlers that do not choose one.
pub const DEFAULT_PRIORITY: i32 = 10;

/// Tracing target for endpoint selection.
pub(crate) const ENDPOINT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::endpoint");

/// A unit that may answer a descriptor.
pub trait EndpointHandler: Send + Sync {
    /// Tag matched against the descriptor's type hint.
    fn type_tag(&self) -> &str;

    /// Rank in the chain; lower values win.
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Returns `true` when this handler applies to `descriptor`.
    ///
    /// The default accepts descriptors without a type hint and those whose
    /// hint equals [`EndpointHandler::type_tag`], ignoring ASCII case.
    fn enable(&self, descriptor: &RequestDescriptor) -> bool {
        descriptor
            .type_hint()
            .is_none_or(|hint| hint.eq_ignore_ascii_case(self.type_tag().trim()))
    }

    /// Answers `descriptor`. Failures are rendered into the returned text.
    fn call(&self, descriptor: &RequestDescriptor) -> String;
}
