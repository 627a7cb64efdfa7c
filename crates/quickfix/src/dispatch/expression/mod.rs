//! Expression evaluation against a resolved target.
//!
//! The gateway never evaluates arbitrary code. Hosts inject an
//! [`ExpressionEngine`]; the bundled [`RestrictedExpressionEngine`] accepts a
//! small grammar over the target's published properties and members:
//!
//! ```text
//! expr     := additive
//! additive := term (('+' | '-') term)*
//! term     := unary (('*' | '/' | '%') unary)*
//! unary    := '-' unary | postfix
//! postfix  := primary ('.' IDENT | '[' expr ']')*
//! primary  := NUMBER | STRING | 'true' | 'false' | 'null'
//!           | IDENT '(' (expr (',' expr)*)? ')'
//!           | IDENT | '#root' | '(' expr ')'
//! ```
//!
//! A bare identifier reads a property of the root; `name(args)` calls a
//! member of the root. `#root.name` is equivalent to `name`.

mod eval;
mod lexer;
mod parser;

use thiserror::Error;

use crate::reflect::Value;
use crate::registry::ResolvedTarget;

/// Longest accepted expression, in bytes.
pub const DEFAULT_MAX_EXPRESSION_BYTES: usize = 4096;
/// Deepest accepted nesting of sub-expressions.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Evaluates expressions with a target as root.
pub trait ExpressionEngine: Send + Sync {
    /// Evaluates `expression` against `target`.
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionError`] for lexical, syntactic and evaluation
    /// failures.
    fn evaluate(&self, target: &ResolvedTarget, expression: &str)
    -> Result<Value, ExpressionError>;
}

/// Raised by an [`ExpressionEngine`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExpressionError {
    /// The source does not match the grammar.
    #[error("syntax error at offset {offset}: {message}")]
    Syntax {
        /// Byte offset of the offending token.
        offset: usize,
        /// What was wrong.
        message: String,
    },
    /// The expression parsed but could not be evaluated.
    #[error("{message}")]
    Evaluation {
        /// What went wrong.
        message: String,
    },
    /// The source exceeds the configured length.
    #[error("expression is {length} bytes, limit is {limit}")]
    TooLong {
        /// Source length in bytes.
        length: usize,
        /// Configured limit.
        limit: usize,
    },
}

impl ExpressionError {
    /// Creates a syntax error at `offset`.
    pub fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            offset,
            message: message.into(),
        }
    }

    /// Creates an evaluation error.
    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation {
            message: message.into(),
        }
    }
}

/// Grammar-restricted engine over properties, member calls and arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestrictedExpressionEngine {
    max_length: usize,
    max_depth: usize,
}

impl RestrictedExpressionEngine {
    /// Creates an engine with explicit limits.
    #[must_use]
    pub const fn new(max_length: usize, max_depth: usize) -> Self {
        Self {
            max_length,
            max_depth,
        }
    }
}

impl Default for RestrictedExpressionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EXPRESSION_BYTES, DEFAULT_MAX_DEPTH)
    }
}

impl ExpressionEngine for RestrictedExpressionEngine {
    fn evaluate(
        &self,
        target: &ResolvedTarget,
        expression: &str,
    ) -> Result<Value, ExpressionError> {
        if expression.len() > self.max_length {
            return Err(ExpressionError::TooLong {
                length: expression.len(),
                limit: self.max_length,
            });
        }
        let tokens = lexer::tokenize(expression)?;
        let ast = parser::parse(tokens, expression.len(), self.max_depth)?;
        eval::Evaluator::new(target).evaluate(&ast)
    }
}
