//! Parameter kinds and the text-to-value coercion policy.

use std::fmt;

use thiserror::Error;

use super::value::Value;

/// Declared kind of a member parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Any text, passed through unchanged.
    Str,
    /// Signed 64-bit integer.
    Int,
    /// 64-bit float; integers are accepted and widened.
    Float,
    /// `true` or `false`, ASCII case-insensitive.
    Bool,
    /// JSON when the text parses as JSON, otherwise the raw text.
    Any,
}

impl ArgKind {
    /// Converts wire text into a value of this kind.
    ///
    /// # Errors
    ///
    /// Returns [`CoercionError`] when the text does not parse as this kind.
    pub fn coerce_text(self, text: &str) -> Result<Value, CoercionError> {
        match self {
            Self::Str => Ok(Value::from(text)),
            Self::Int => text
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| CoercionError::new(self, text)),
            Self::Float => text
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| CoercionError::new(self, text)),
            Self::Bool => {
                let trimmed = text.trim();
                if trimmed.eq_ignore_ascii_case("true") {
                    Ok(Value::Bool(true))
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Ok(Value::Bool(false))
                } else {
                    Err(CoercionError::new(self, text))
                }
            }
            Self::Any => Ok(serde_json::from_str::<serde_json::Value>(text)
                .map_or_else(|_| Value::from(text), Value::from_json)),
        }
    }

    /// Checks an already-typed value against this kind.
    ///
    /// Used for member calls inside expressions: strings go through
    /// [`ArgKind::coerce_text`], integers widen to floats, and `Str`
    /// parameters accept the display form of any value.
    ///
    /// # Errors
    ///
    /// Returns [`CoercionError`] when the value cannot stand in for this
    /// kind.
    pub fn coerce_value(self, value: Value) -> Result<Value, CoercionError> {
        match (self, value) {
            (Self::Any, value) => Ok(value),
            (Self::Str, Value::Str(text)) => Ok(Value::Str(text)),
            (Self::Str, other) => Ok(Value::Str(other.to_string())),
            (_, Value::Str(text)) => self.coerce_text(&text),
            (Self::Int, Value::Int(number)) => Ok(Value::Int(number)),
            (Self::Float, Value::Float(number)) => Ok(Value::Float(number)),
            (Self::Float, Value::Int(number)) => Ok(Value::Float(number as f64)),
            (Self::Bool, Value::Bool(flag)) => Ok(Value::Bool(flag)),
            (_, other) => Err(CoercionError::new(self, other.to_string())),
        }
    }
}

impl fmt::Display for ArgKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Str => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Any => "any",
        };
        formatter.write_str(label)
    }
}

/// Raised when an argument does not convert to its declared kind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot convert '{input}' to {expected}")]
pub struct CoercionError {
    /// Kind the parameter declares.
    pub expected: ArgKind,
    /// Offending input as received.
    pub input: String,
}

impl CoercionError {
    fn new(expected: ArgKind, input: impl Into<String>) -> Self {
        Self {
            expected,
            input: input.into(),
        }
    }
}
