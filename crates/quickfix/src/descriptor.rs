//! Application-level request payload.
//!
//! The body of every wire request is a JSON document naming a target server,
//! an optional type discriminator used to pick an endpoint, and either a
//! member call or an expression:
//!
//! ```json
//! {"type": "service", "server": "echoService", "method": "say", "args": ["hi"]}
//! {"server": "demo.Counter", "expression": "hits * 2"}
//! ```

use serde::Deserialize;
use thiserror::Error;

/// What to run against the resolved target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Reflective member call with textual arguments.
    Call {
        /// Member name.
        method: String,
        /// Arguments as received; coerced later against the member's kinds.
        args: Vec<String>,
    },
    /// Expression evaluated with the target as root.
    Expression {
        /// Expression source text.
        expression: String,
    },
}

/// Parsed diagnostic request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    server: String,
    type_hint: Option<String>,
    invocation: Invocation,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDescriptor {
    #[serde(rename = "type", default)]
    type_hint: Option<String>,
    server: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    args: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    expression: Option<String>,
}

impl RequestDescriptor {
    /// Describes a member call.
    pub fn call<I, S>(server: impl Into<String>, method: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            server: server.into(),
            type_hint: None,
            invocation: Invocation::Call {
                method: method.into(),
                args: args.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// Describes an expression evaluation.
    pub fn expression(server: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            type_hint: None,
            invocation: Invocation::Expression {
                expression: expression.into(),
            },
        }
    }

    /// Attaches a type discriminator.
    #[must_use]
    pub fn with_type_hint(mut self, type_hint: impl Into<String>) -> Self {
        self.type_hint = Some(type_hint.into());
        self
    }

    /// Parses a request body.
    ///
    /// String elements of `args` are taken verbatim; any other JSON value is
    /// passed on as its JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] when the body is not valid JSON, names no
    /// server, or carries neither or both of `method` and `expression`.
    pub fn parse(body: &str) -> Result<Self, DescriptorError> {
        let raw: RawDescriptor = serde_json::from_str(body).map_err(DescriptorError::malformed)?;
        if raw.server.trim().is_empty() {
            return Err(DescriptorError::EmptyServer);
        }

        let invocation = match (raw.method, raw.expression) {
            (Some(method), None) => Invocation::Call {
                method,
                args: raw
                    .args
                    .unwrap_or_default()
                    .into_iter()
                    .map(argument_text)
                    .collect(),
            },
            (None, Some(expression)) => Invocation::Expression { expression },
            (None, None) => return Err(DescriptorError::MissingInvocation),
            (Some(_), Some(_)) => return Err(DescriptorError::AmbiguousInvocation),
        };

        Ok(Self {
            server: raw.server,
            type_hint: raw.type_hint,
            invocation,
        })
    }

    /// Server identifier as sent, untrimmed.
    #[must_use]
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Trimmed type discriminator, or `None` when absent or blank.
    #[must_use]
    pub fn type_hint(&self) -> Option<&str> {
        self.type_hint
            .as_deref()
            .map(str::trim)
            .filter(|hint| !hint.is_empty())
    }

    /// The requested invocation.
    #[must_use]
    pub const fn invocation(&self) -> &Invocation {
        &self.invocation
    }
}

fn argument_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    }
}

/// Raised when a body is not a usable descriptor.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The body is not a JSON object of the expected shape.
    #[error("malformed descriptor: {message}")]
    Malformed {
        /// Parser message.
        message: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// Neither `method` nor `expression` was supplied.
    #[error("descriptor names neither a method nor an expression")]
    MissingInvocation,
    /// Both `method` and `expression` were supplied.
    #[error("descriptor names both a method and an expression")]
    AmbiguousInvocation,
    /// `server` is empty or whitespace.
    #[error("descriptor server is empty")]
    EmptyServer,
}

impl DescriptorError {
    fn malformed(source: serde_json::Error) -> Self {
        Self::Malformed {
            message: source.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn parses_member_call() {
        let descriptor =
            RequestDescriptor::parse(r#"{"server":"echoService","method":"say","args":["hi"]}"#)
                .expect("parse call");
        assert_eq!(descriptor.server(), "echoService");
        assert_eq!(descriptor.type_hint(), None);
        assert_eq!(
            descriptor,
            RequestDescriptor::call("echoService", "say", ["hi"])
        );
    }

    #[test]
    fn non_string_arguments_keep_their_json_text() {
        let descriptor = RequestDescriptor::parse(
            r#"{"server":"s","method":"m","args":[1, 2.5, true, null, {"k":[1]}, "text"]}"#,
        )
        .expect("parse call");
        let Invocation::Call { args, .. } = descriptor.invocation() else {
            panic!("expected a call");
        };
        assert_eq!(args, &["1", "2.5", "true", "null", r#"{"k":[1]}"#, "text"]);
    }

    #[rstest]
    #[case::null(r#"{"server":"s","method":"now","args":null}"#)]
    #[case::absent(r#"{"server":"s","method":"now"}"#)]
    fn null_or_absent_args_mean_no_arguments(#[case] body: &str) {
        let descriptor = RequestDescriptor::parse(body).expect("parse call");
        assert_eq!(
            descriptor,
            RequestDescriptor::call("s", "now", Vec::<String>::new())
        );
    }

    #[test]
    fn parses_expression_with_type() {
        let descriptor = RequestDescriptor::parse(
            r#"{"type":" Service ","server":"demo.Counter","expression":"hits"}"#,
        )
        .expect("parse expression");
        assert_eq!(descriptor.type_hint(), Some("Service"));
        assert_eq!(
            descriptor.invocation(),
            &Invocation::Expression {
                expression: String::from("hits")
            }
        );
    }

    #[rstest]
    #[case::blank("   ")]
    #[case::empty("")]
    fn blank_type_hint_is_absent(#[case] hint: &str) {
        let descriptor =
            RequestDescriptor::call("s", "m", Vec::<String>::new()).with_type_hint(hint);
        assert_eq!(descriptor.type_hint(), None);
    }

    #[rstest]
    #[case::not_json("say hi")]
    #[case::missing_server(r#"{"method":"say"}"#)]
    #[case::unknown_field(r#"{"server":"s","method":"m","extra":1}"#)]
    fn rejects_malformed_bodies(#[case] body: &str) {
        let error = RequestDescriptor::parse(body).expect_err("malformed");
        assert!(matches!(error, DescriptorError::Malformed { .. }));
    }

    #[test]
    fn rejects_missing_invocation() {
        let error = RequestDescriptor::parse(r#"{"server":"s"}"#).expect_err("missing");
        assert!(matches!(error, DescriptorError::MissingInvocation));
    }

    #[test]
    fn rejects_ambiguous_invocation() {
        let error = RequestDescriptor::parse(r#"{"server":"s","method":"m","expression":"1"}"#)
            .expect_err("ambiguous");
        assert!(matches!(error, DescriptorError::AmbiguousInvocation));
    }

    #[test]
    fn rejects_blank_server() {
        let error =
            RequestDescriptor::parse(r#"{"server":"  ","method":"m"}"#).expect_err("blank server");
        assert!(matches!(error, DescriptorError::EmptyServer));
    }
}
