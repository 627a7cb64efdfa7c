//! Framing failures surfaced while decoding a request.

use std::io;

use thiserror::Error;

/// Errors raised while decoding a [`WireRequest`](super::WireRequest).
///
/// Every variant aborts decoding before any dispatch happens.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The stream closed before a request line arrived.
    #[error("connection closed before a request line was received")]
    EmptyRequest,

    /// The request line did not split into method, uri and version.
    #[error("malformed request line '{line}': expected 3 space-separated tokens, found {tokens}")]
    MalformedRequestLine { line: String, tokens: usize },

    /// A header line had no `:` separator or an empty name.
    #[error("malformed header '{line}'")]
    MalformedHeader { line: String },

    /// The stream closed inside the header block.
    #[error("connection closed before the end of the header block")]
    UnexpectedEof,

    /// The header block exceeded the configured bound.
    #[error("header block exceeds {limit} bytes")]
    HeaderTooLarge { limit: usize },

    /// `Content-Length` was not a non-negative integer.
    #[error("invalid Content-Length '{value}'")]
    InvalidContentLength { value: String },

    /// `Content-Length` exceeded the configured body limit.
    #[error("request body of {length} bytes exceeds {limit} byte limit")]
    BodyTooLarge { length: usize, limit: usize },

    /// The stream closed before `Content-Length` bytes arrived.
    #[error("request body truncated: expected {expected} bytes, received {received}")]
    TruncatedBody { expected: usize, received: usize },

    /// The body was not valid UTF-8 text.
    #[error("request body is not valid UTF-8: {source}")]
    InvalidBody {
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// Reading from the connection failed, including read timeouts.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl CodecError {
    /// Creates a malformed request line error.
    pub fn malformed_request_line(line: impl Into<String>, tokens: usize) -> Self {
        Self::MalformedRequestLine {
            line: line.into(),
            tokens,
        }
    }

    /// Creates a malformed header error.
    pub fn malformed_header(line: impl Into<String>) -> Self {
        Self::MalformedHeader { line: line.into() }
    }

    /// Creates an invalid content length error.
    pub fn invalid_content_length(value: impl Into<String>) -> Self {
        Self::InvalidContentLength {
            value: value.into(),
        }
    }

    /// Returns `true` when the peer went away without sending anything.
    ///
    /// Connection handlers stay silent in that case instead of writing an
    /// error response nobody will read.
    #[must_use]
    pub const fn is_disconnect(&self) -> bool {
        matches!(self, Self::EmptyRequest)
    }
}
