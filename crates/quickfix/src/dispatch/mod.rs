//! Invocation dispatch against resolved targets.
//!
//! A [`Dispatcher`] performs one of two operations on a
//! [`ResolvedTarget`](crate::registry::ResolvedTarget):
//!
//! - a reflective member call, selecting the overload by arity and coercing
//!   each textual argument with the parameter's declared kind;
//! - an expression evaluation, delegated to an injected
//!   [`ExpressionEngine`].
//!
//! Results are stringified for the response body: strings raw, `null` for
//! absent values, compact JSON for everything else. Failures surface as
//! [`DispatchError`] and are rendered into the body by the endpoint.

mod errors;
pub mod expression;
mod invoker;

pub use self::errors::DispatchError;
pub use self::expression::{ExpressionEngine, ExpressionError, RestrictedExpressionEngine};
pub use self::invoker::Dispatcher;

pub(crate) use self::invoker::run_member;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
