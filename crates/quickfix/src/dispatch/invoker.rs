//! Reflective calls and expression evaluation against a resolved target.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::debug;

use crate::descriptor::Invocation;
use crate::reflect::{Member, Value};
use crate::registry::ResolvedTarget;

use super::errors::DispatchError;
use super::expression::{ExpressionEngine, RestrictedExpressionEngine};
use super::DISPATCH_TARGET;

/// Runs invocations. Holds no per-request state.
#[derive(Clone)]
pub struct Dispatcher {
    engine: Arc<dyn ExpressionEngine>,
}

impl Dispatcher {
    /// Builds a dispatcher evaluating expressions with `engine`.
    #[must_use]
    pub fn new(engine: Arc<dyn ExpressionEngine>) -> Self {
        Self { engine }
    }

    /// Calls `member` on `target` with textual `args`.
    ///
    /// The overload is chosen by arity and each argument is coerced with the
    /// overload's declared kind.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MemberNotFound`],
    /// [`DispatchError::ArgumentCoercion`] or
    /// [`DispatchError::InvocationFailed`].
    pub fn invoke(
        &self,
        target: &ResolvedTarget,
        member: &str,
        args: &[String],
    ) -> Result<Value, DispatchError> {
        let descriptor = target.descriptor();
        let Some(overload) = descriptor.member(member, args.len()) else {
            let available = descriptor
                .overloads(member)
                .iter()
                .map(Member::arity)
                .collect();
            return Err(DispatchError::member_not_found(
                descriptor.name(),
                member,
                args.len(),
                available,
            ));
        };

        let values = args
            .iter()
            .zip(overload.params())
            .enumerate()
            .map(|(index, (text, kind))| {
                kind.coerce_text(text).map_err(|error| {
                    DispatchError::argument_coercion(member, index, error.expected, error.input)
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            target: DISPATCH_TARGET,
            type_name = descriptor.name(),
            member,
            arity = values.len(),
            "invoking member"
        );
        run_member(overload, target, &values)
            .map_err(|message| DispatchError::invocation_failed(member, message))
    }

    /// Evaluates `expression` with `target` as root.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ExpressionEvaluation`] carrying the engine's
    /// message.
    pub fn evaluate(
        &self,
        target: &ResolvedTarget,
        expression: &str,
    ) -> Result<Value, DispatchError> {
        debug!(
            target: DISPATCH_TARGET,
            type_name = target.type_name(),
            "evaluating expression"
        );
        self.engine
            .evaluate(target, expression)
            .map_err(|error| DispatchError::expression_evaluation(expression, error.to_string()))
    }

    /// Runs `invocation` and stringifies the result.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`Dispatcher::invoke`] and
    /// [`Dispatcher::evaluate`].
    pub fn dispatch(
        &self,
        target: &ResolvedTarget,
        invocation: &Invocation,
    ) -> Result<String, DispatchError> {
        let value = match invocation {
            Invocation::Call { method, args } => self.invoke(target, method, args)?,
            Invocation::Expression { expression } => self.evaluate(target, expression)?,
        };
        Ok(value.to_string())
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Arc::new(RestrictedExpressionEngine::default()))
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

/// Invokes `member`, converting returned errors and panics into messages.
pub(crate) fn run_member(
    member: &Member,
    target: &ResolvedTarget,
    values: &[Value],
) -> Result<Value, String> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        member.invoke(target.instance(), values)
    }));
    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(error.to_string()),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .map_or_else(
            || String::from("member panicked"),
            |message| format!("member panicked: {message}"),
        )
}
