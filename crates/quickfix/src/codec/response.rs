//! Response encoding.

use std::io::{self, Write};

const LINE_END: &str = "\r\n";
const STATUS_OK: u16 = 200;
const STATUS_TEXT_OK: &str = "ok";
const CONTENT_TYPE_JSON: &str = "application/json";

/// A response envelope ready for encoding.
///
/// Only [`WireResponse::ok`] constructs one, so every response carries the
/// fixed `200 ok` status and exactly the `Content-Type` and `Content-Length`
/// headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    version: String,
    code: u16,
    status: &'static str,
    headers: Vec<(&'static str, String)>,
    body: String,
}

impl WireResponse {
    /// Builds the success response for `body`, echoing `version`.
    pub fn ok(version: impl Into<String>, body: impl Into<String>) -> Self {
        let body = body.into();
        let headers = vec![
            ("Content-Type", CONTENT_TYPE_JSON.to_owned()),
            ("Content-Length", body.len().to_string()),
        ];
        Self {
            version: version.into(),
            code: STATUS_OK,
            status: STATUS_TEXT_OK,
            headers,
            body,
        }
    }

    /// Protocol version on the status line.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Numeric status code.
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.code
    }

    /// Reason phrase on the status line.
    #[must_use]
    pub const fn status(&self) -> &'static str {
        self.status
    }

    /// Headers in emission order.
    #[must_use]
    pub fn headers(&self) -> &[(&'static str, String)] {
        &self.headers
    }

    /// Body text.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Serialises the status line, headers, blank line and raw body.
    ///
    /// Headers are written as `key:value` and the body is not followed by a
    /// line terminator.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut head = format!("{} {} {}{LINE_END}", self.version, self.code, self.status);
        for (name, value) in &self.headers {
            head.push_str(name);
            head.push(':');
            head.push_str(value);
            head.push_str(LINE_END);
        }
        head.push_str(LINE_END);

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(self.body.as_bytes());
        bytes
    }

    /// Encodes the response and writes it to `writer`, then flushes.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.encode())?;
        writer.flush()
    }
}

/// Encodes the success response for `body`.
#[must_use]
pub fn encode(version: &str, body: &str) -> Vec<u8> {
    WireResponse::ok(version, body).encode()
}
