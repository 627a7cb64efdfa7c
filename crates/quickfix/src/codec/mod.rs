//! Line-oriented wire framing for diagnostic requests.
//!
//! Requests use an HTTP/1.x-shaped envelope:
//!
//! ```text
//! POST /fix HTTP/1.1
//! Content-Length: 53
//!
//! {"server":"echoService","method":"say","args":["hi"]}
//! ```
//!
//! The request line carries exactly three space-separated tokens, headers
//! run until the first empty line, and the body is read strictly by
//! `Content-Length`; it is never scanned for a delimiter.
//!
//! Responses are always normalised to a `200 ok` status line with exactly two
//! headers, `Content-Type` and `Content-Length`, regardless of what the
//! request carried. Decoding and encoding are therefore not inverses of each
//! other.

mod errors;
mod request;
mod response;

pub use self::errors::CodecError;
pub use self::request::{DecodeLimits, WireRequest};
pub use self::response::{WireResponse, encode};

/// Version echoed when the request line could not be parsed.
pub const FALLBACK_VERSION: &str = "HTTP/1.1";
