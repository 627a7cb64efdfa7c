//! Error types for invocation dispatch.
//!
//! Every variant is rendered into the response body by the endpoint that
//! produced it; none of them change the wire status.

use thiserror::Error;

use crate::reflect::ArgKind;
use crate::resolver::ResolveError;

/// Errors surfaced while running a call or an expression against a target.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// No member with the requested name and arity exists.
    #[error(
        "member not found: {type_name}.{member} taking {arity} argument(s){}",
        describe_arities(.available)
    )]
    MemberNotFound {
        /// Type that was searched.
        type_name: String,
        /// Requested member name.
        member: String,
        /// Number of arguments supplied.
        arity: usize,
        /// Arities of the overloads that do exist.
        available: Vec<usize>,
    },

    /// An argument could not be converted to the parameter's kind.
    #[error("argument {index} of {member}: cannot convert '{input}' to {expected}")]
    ArgumentCoercion {
        /// Member being called.
        member: String,
        /// Zero-based argument position.
        index: usize,
        /// Declared parameter kind.
        expected: ArgKind,
        /// Offending input.
        input: String,
    },

    /// The member body returned an error or panicked.
    #[error("invocation of {member} failed: {message}")]
    InvocationFailed {
        /// Member being called.
        member: String,
        /// Message carried by the failure.
        message: String,
    },

    /// The expression engine rejected or failed to evaluate the expression.
    #[error("expression evaluation failed: {message}")]
    ExpressionEvaluation {
        /// Expression source.
        expression: String,
        /// Engine message.
        message: String,
    },

    /// The server identifier did not resolve.
    #[error(transparent)]
    ServerNotFound(#[from] ResolveError),
}

impl DispatchError {
    /// Creates a member-not-found error.
    pub fn member_not_found(
        type_name: impl Into<String>,
        member: impl Into<String>,
        arity: usize,
        available: Vec<usize>,
    ) -> Self {
        Self::MemberNotFound {
            type_name: type_name.into(),
            member: member.into(),
            arity,
            available,
        }
    }

    /// Creates an argument coercion error.
    pub fn argument_coercion(
        member: impl Into<String>,
        index: usize,
        expected: ArgKind,
        input: impl Into<String>,
    ) -> Self {
        Self::ArgumentCoercion {
            member: member.into(),
            index,
            expected,
            input: input.into(),
        }
    }

    /// Creates an invocation failure.
    pub fn invocation_failed(member: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvocationFailed {
            member: member.into(),
            message: message.into(),
        }
    }

    /// Creates an expression evaluation failure.
    pub fn expression_evaluation(
        expression: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ExpressionEvaluation {
            expression: expression.into(),
            message: message.into(),
        }
    }
}

fn describe_arities(available: &[usize]) -> String {
    if available.is_empty() {
        return String::new();
    }
    let listed: Vec<String> = available.iter().map(ToString::to_string).collect();
    format!(" (available arities: {})", listed.join(", "))
}
