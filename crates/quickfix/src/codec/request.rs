//! Request decoding.

use std::collections::HashMap;
use std::io::{BufRead, Read};

use super::errors::CodecError;

const CONTENT_LENGTH: &str = "content-length";

/// Default bound on the request line plus header block.
pub const DEFAULT_MAX_HEADER_BYTES: usize = 64 * 1024;

/// Default bound on the request body.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Size limits enforced while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Upper bound on the request line and headers together, in bytes.
    pub max_header_bytes: usize,
    /// Upper bound on `Content-Length`.
    pub max_body_bytes: usize,
}

impl DecodeLimits {
    /// Limits with the default header bound and the given body bound.
    #[must_use]
    pub const fn with_max_body(max_body_bytes: usize) -> Self {
        Self {
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            max_body_bytes,
        }
    }
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self::with_max_body(DEFAULT_MAX_BODY_BYTES)
    }
}

/// A decoded request envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    method: String,
    uri: String,
    version: String,
    headers: HashMap<String, String>,
    body: String,
}

impl WireRequest {
    /// Decodes one request from `reader`.
    ///
    /// Reads the request line, then header lines up to the first empty line,
    /// then exactly `Content-Length` bytes of body (none when the header is
    /// absent or zero). Nothing past the body is consumed.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] describing the first framing violation, or
    /// [`CodecError::Io`] when the underlying read fails or times out.
    pub fn decode<R: BufRead>(reader: &mut R, limits: &DecodeLimits) -> Result<Self, CodecError> {
        let mut budget = limits.max_header_bytes;
        let line = read_line(reader, &mut budget, limits.max_header_bytes)?
            .ok_or(CodecError::EmptyRequest)?;
        let (method, uri, version) = parse_request_line(&line)?;
        let headers = read_headers(reader, &mut budget, limits.max_header_bytes)?;
        let length = content_length(&headers, limits.max_body_bytes)?;
        let body = read_body(reader, length)?;

        Ok(Self {
            method,
            uri,
            version,
            headers,
            body,
        })
    }

    /// Decodes a request held entirely in memory, using default limits.
    ///
    /// # Errors
    ///
    /// See [`WireRequest::decode`].
    pub fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut reader = bytes;
        Self::decode(&mut reader, &DecodeLimits::default())
    }

    /// Request method, for example `POST`.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request target.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Protocol version token, echoed in the response status line.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// All headers, keyed by their ASCII-lowercased name.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Looks up a header value, ignoring ASCII case in the name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Body text; empty when no `Content-Length` was sent.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Reads one line, without its terminator, charging it against `budget`.
///
/// Returns `Ok(None)` at end of stream.
fn read_line<R: BufRead>(
    reader: &mut R,
    budget: &mut usize,
    limit: usize,
) -> Result<Option<Vec<u8>>, CodecError> {
    let mut line = Vec::new();
    let allowance = u64::try_from(*budget).unwrap_or(u64::MAX).saturating_add(1);
    let read = reader.by_ref().take(allowance).read_until(b'\n', &mut line)?;
    if read == 0 {
        return Ok(None);
    }
    if read > *budget {
        return Err(CodecError::HeaderTooLarge { limit });
    }
    *budget -= read;

    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
    Ok(Some(line))
}

fn parse_request_line(line: &[u8]) -> Result<(String, String, String), CodecError> {
    let text = String::from_utf8_lossy(line);
    let tokens: Vec<&str> = text.split(' ').collect();
    match tokens.as_slice() {
        [method, uri, version]
            if !method.is_empty() && !uri.is_empty() && !version.is_empty() =>
        {
            Ok((
                (*method).to_owned(),
                (*uri).to_owned(),
                (*version).to_owned(),
            ))
        }
        _ => Err(CodecError::malformed_request_line(
            text.to_string(),
            tokens.len(),
        )),
    }
}

fn read_headers<R: BufRead>(
    reader: &mut R,
    budget: &mut usize,
    limit: usize,
) -> Result<HashMap<String, String>, CodecError> {
    let mut headers = HashMap::new();
    loop {
        let line = read_line(reader, budget, limit)?.ok_or(CodecError::UnexpectedEof)?;
        if line.is_empty() {
            return Ok(headers);
        }
        let (name, value) = parse_header(&line)?;
        headers.insert(name, value);
    }
}

fn parse_header(line: &[u8]) -> Result<(String, String), CodecError> {
    let text = std::str::from_utf8(line)
        .map_err(|_| CodecError::malformed_header(String::from_utf8_lossy(line)))?;
    let Some((name, value)) = text.split_once(':') else {
        return Err(CodecError::malformed_header(text));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(CodecError::malformed_header(text));
    }
    Ok((name.to_ascii_lowercase(), value.trim().to_owned()))
}

fn content_length(headers: &HashMap<String, String>, limit: usize) -> Result<usize, CodecError> {
    let Some(value) = headers.get(CONTENT_LENGTH) else {
        return Ok(0);
    };
    let length = value
        .parse::<usize>()
        .map_err(|_| CodecError::invalid_content_length(value))?;
    if length > limit {
        return Err(CodecError::BodyTooLarge { length, limit });
    }
    Ok(length)
}

fn read_body<R: BufRead>(reader: &mut R, length: usize) -> Result<String, CodecError> {
    if length == 0 {
        return Ok(String::new());
    }
    let mut body = Vec::with_capacity(length);
    let expected = u64::try_from(length).unwrap_or(u64::MAX);
    reader.by_ref().take(expected).read_to_end(&mut body)?;
    if body.len() < length {
        return Err(CodecError::TruncatedBody {
            expected: length,
            received: body.len(),
        });
    }
    String::from_utf8(body).map_err(|source| CodecError::InvalidBody { source })
}

#[cfg(test)]
mod tests {
    use std::io::{self, BufReader};

    use rstest::rstest;

    use super::*;

    /// Reader that fails the test if anything reads past the prepared bytes.
    struct NoReadPastEnd<'a> {
        data: &'a [u8],
    }

    impl Read for NoReadPastEnd<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.data.is_empty() {
                return Err(io::Error::new(
                    io::ErrorKind::WouldBlock,
                    "decoder read past the header block",
                ));
            }
            let count = buf.len().min(self.data.len());
            buf[..count].copy_from_slice(&self.data[..count]);
            self.data = &self.data[count..];
            Ok(count)
        }
    }

    fn request_with_body(body: &str) -> Vec<u8> {
        format!(
            "POST /fix HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        )
        .into_bytes()
    }

    #[test]
    fn decodes_request_line_headers_and_body() {
        let body = r#"{"server":"echoService","method":"say","args":["hi"]}"#;
        let request = WireRequest::parse(&request_with_body(body)).expect("decode request");
        assert_eq!(request.method(), "POST");
        assert_eq!(request.uri(), "/fix");
        assert_eq!(request.version(), "HTTP/1.1");
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.body(), body);
    }

    #[test]
    fn accepts_bare_line_feeds() {
        let raw = b"POST / HTTP/1.0\nContent-Length: 2\n\nok";
        let request = WireRequest::parse(raw).expect("decode request");
        assert_eq!(request.body(), "ok");
    }

    #[rstest]
    #[case::absent("GET / HTTP/1.1\r\nHost: local\r\n\r\n")]
    #[case::zero("GET / HTTP/1.1\r\nContent-Length: 0\r\n\r\n")]
    fn missing_or_zero_length_yields_empty_body_without_blocking(#[case] raw: &str) {
        let mut reader = BufReader::with_capacity(1, NoReadPastEnd { data: raw.as_bytes() });
        let request =
            WireRequest::decode(&mut reader, &DecodeLimits::default()).expect("decode request");
        assert!(request.body().is_empty());
    }

    #[test]
    fn body_is_length_prefixed_not_delimited() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nab\r\n\r\ntrailing";
        let request = WireRequest::parse(raw).expect("decode request");
        assert_eq!(request.body(), "ab\r\n\r");
    }

    #[test]
    fn content_length_counts_bytes() {
        let body = "héllo";
        let request = WireRequest::parse(&request_with_body(body)).expect("decode request");
        assert_eq!(request.body(), body);
    }

    #[rstest]
    #[case::two_tokens("GET HTTP/1.1\r\n\r\n", 2)]
    #[case::four_tokens("GET / x HTTP/1.1\r\n\r\n", 4)]
    #[case::double_space("GET  / HTTP/1.1\r\n\r\n", 4)]
    #[case::empty_line("\r\n\r\n", 1)]
    fn rejects_malformed_request_line(#[case] raw: &str, #[case] expected_tokens: usize) {
        let error = WireRequest::parse(raw.as_bytes()).expect_err("request line is malformed");
        assert!(
            matches!(error, CodecError::MalformedRequestLine { tokens, .. } if tokens == expected_tokens),
            "unexpected error: {error:?}"
        );
    }

    #[test]
    fn trailing_space_leaves_an_empty_token() {
        let error = WireRequest::parse(b"GET / \r\n\r\n").expect_err("empty version");
        assert!(matches!(error, CodecError::MalformedRequestLine { .. }));
    }

    #[rstest]
    #[case::no_colon("GET / HTTP/1.1\r\nbroken header\r\n\r\n")]
    #[case::empty_name("GET / HTTP/1.1\r\n: value\r\n\r\n")]
    fn rejects_malformed_header(#[case] raw: &str) {
        let error = WireRequest::parse(raw.as_bytes()).expect_err("header is malformed");
        assert!(matches!(error, CodecError::MalformedHeader { .. }));
    }

    #[test]
    fn header_splits_on_first_colon_only() {
        let raw = b"GET / HTTP/1.1\r\nHost: 127.0.0.1:9787\r\n\r\n";
        let request = WireRequest::parse(raw).expect("decode request");
        assert_eq!(request.header("host"), Some("127.0.0.1:9787"));
    }

    #[test]
    fn repeated_header_keeps_last_value() {
        let raw = b"GET / HTTP/1.1\r\nX-Trace: a\r\nX-Trace: b\r\n\r\n";
        let request = WireRequest::parse(raw).expect("decode request");
        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.header("x-trace"), Some("b"));
    }

    #[rstest]
    #[case::canonical_then_lower("Content-Length: 2\r\ncontent-length: 5\r\n", "hello")]
    #[case::lower_then_canonical("content-length: 5\r\nContent-Length: 2\r\n", "he")]
    fn differently_cased_length_headers_keep_the_last(#[case] headers: &str, #[case] body: &str) {
        let raw = format!("POST / HTTP/1.1\r\n{headers}\r\nhello");
        for _ in 0..64 {
            let request = WireRequest::parse(raw.as_bytes()).expect("decode request");
            assert_eq!(request.body(), body);
            assert_eq!(request.headers().len(), 1);
        }
    }

    #[test]
    fn empty_stream_is_reported_as_disconnect() {
        let error = WireRequest::parse(b"").expect_err("nothing to decode");
        assert!(error.is_disconnect());
    }

    #[test]
    fn eof_inside_headers_is_rejected() {
        let error =
            WireRequest::parse(b"GET / HTTP/1.1\r\nHost: x\r\n").expect_err("no blank line");
        assert!(matches!(error, CodecError::UnexpectedEof));
    }

    #[test]
    fn short_body_is_rejected() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc";
        let error = WireRequest::parse(raw).expect_err("body is short");
        assert!(matches!(
            error,
            CodecError::TruncatedBody {
                expected: 10,
                received: 3
            }
        ));
    }

    #[rstest]
    #[case::negative("-1")]
    #[case::text("ten")]
    fn rejects_invalid_content_length(#[case] value: &str) {
        let raw = format!("POST / HTTP/1.1\r\nContent-Length: {value}\r\n\r\n");
        let error = WireRequest::parse(raw.as_bytes()).expect_err("length is invalid");
        assert!(matches!(error, CodecError::InvalidContentLength { .. }));
    }

    #[test]
    fn enforces_body_limit() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 11\r\n\r\nhello world";
        let mut reader = &raw[..];
        let error = WireRequest::decode(&mut reader, &DecodeLimits::with_max_body(10))
            .expect_err("body exceeds limit");
        assert!(matches!(
            error,
            CodecError::BodyTooLarge {
                length: 11,
                limit: 10
            }
        ));
    }

    #[test]
    fn enforces_header_limit() {
        let raw = format!("GET / HTTP/1.1\r\nX-Pad: {}\r\n\r\n", "a".repeat(128));
        let limits = DecodeLimits {
            max_header_bytes: 64,
            max_body_bytes: 16,
        };
        let mut reader = raw.as_bytes();
        let error = WireRequest::decode(&mut reader, &limits).expect_err("headers too large");
        assert!(matches!(error, CodecError::HeaderTooLarge { limit: 64 }));
    }

    #[test]
    fn rejects_non_utf8_body() {
        let mut raw = b"POST / HTTP/1.1\r\nContent-Length: 2\r\n\r\n".to_vec();
        raw.extend_from_slice(&[0xff, 0xfe]);
        let error = WireRequest::parse(&raw).expect_err("body is not utf8");
        assert!(matches!(error, CodecError::InvalidBody { .. }));
    }
}
