//! Connection handler gluing the codec to the endpoint chain.
//!
//! One connection carries one request: the handler decodes the envelope,
//! parses the body into a [`RequestDescriptor`], lets the chain answer it and
//! writes the encoded response before the stream is dropped.

use std::io::{self, BufReader, Read, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use quickfix_config::Config;

use crate::codec::{CodecError, DecodeLimits, FALLBACK_VERSION, WireRequest, WireResponse};
use crate::descriptor::RequestDescriptor;
use crate::endpoint::EndpointChain;
use crate::transport::{ConnectionHandler, ConnectionStream};

const GATEWAY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::gateway");

/// Serves decoded requests from a frozen [`EndpointChain`].
#[derive(Debug, Clone)]
pub struct Gateway {
    chain: Arc<EndpointChain>,
    limits: DecodeLimits,
    request_timeout: Option<Duration>,
}

impl Gateway {
    /// Builds a gateway with default decode limits and no request deadline.
    #[must_use]
    pub fn new(chain: Arc<EndpointChain>) -> Self {
        Self {
            chain,
            limits: DecodeLimits::default(),
            request_timeout: None,
        }
    }

    /// Builds a gateway using the body limit and request deadline in
    /// `config`.
    #[must_use]
    pub fn from_config(chain: Arc<EndpointChain>, config: &Config) -> Self {
        Self::new(chain)
            .with_limits(DecodeLimits::with_max_body(config.max_body_bytes()))
            .with_request_timeout(config.read_timeout())
    }

    /// Overrides the decode limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: DecodeLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Bounds the time a connection may take to deliver its whole request,
    /// however the bytes are spread out.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// The chain answering requests.
    #[must_use]
    pub fn chain(&self) -> &EndpointChain {
        &self.chain
    }

    /// Answers one decoded request.
    ///
    /// Descriptor errors are rendered into the body like any other failure,
    /// so the response always carries the request's version and `200 ok`.
    #[must_use]
    pub fn handle_request(&self, request: &WireRequest) -> WireResponse {
        let body = match RequestDescriptor::parse(request.body()) {
            Ok(descriptor) => {
                debug!(
                    target: GATEWAY_TARGET,
                    server = descriptor.server(),
                    type_hint = descriptor.type_hint(),
                    "request decoded"
                );
                self.chain.dispatch(&descriptor)
            }
            Err(error) => {
                warn!(target: GATEWAY_TARGET, %error, "invalid request descriptor");
                format!("error: {error}")
            }
        };
        WireResponse::ok(request.version(), body)
    }

    /// Reads one request from `stream` and writes the answer back.
    ///
    /// A framing failure is answered with a `malformed request` body under
    /// the fallback version. A peer that closed without sending anything gets
    /// no response.
    ///
    /// # Errors
    ///
    /// Returns any error raised while writing the response.
    pub fn serve<S: Read + Write>(&self, stream: &mut S) -> io::Result<()> {
        let decoded = {
            let mut reader = BufReader::new(&mut *stream);
            WireRequest::decode(&mut reader, &self.limits)
        };

        let response = match decoded {
            Ok(request) => self.handle_request(&request),
            Err(error) if error.is_disconnect() => {
                debug!(target: GATEWAY_TARGET, "client disconnected without request");
                return Ok(());
            }
            Err(error) => framing_failure(&error),
        };
        response.write_to(stream)
    }
}

fn framing_failure(error: &CodecError) -> WireResponse {
    warn!(target: GATEWAY_TARGET, %error, "malformed request");
    WireResponse::ok(FALLBACK_VERSION, format!("malformed request: {error}"))
}

impl ConnectionHandler for Gateway {
    fn handle(&self, mut stream: ConnectionStream) {
        let served = match self.request_timeout {
            Some(timeout) => self.serve(&mut Deadline::new(&mut stream, timeout)),
            None => self.serve(&mut stream),
        };
        if let Err(error) = served {
            warn!(target: GATEWAY_TARGET, %error, "failed to write response");
        }
    }
}

/// Stream wrapper that shrinks the read timeout as the deadline approaches.
struct Deadline<'a> {
    stream: &'a mut ConnectionStream,
    expires: Instant,
}

impl<'a> Deadline<'a> {
    fn new(stream: &'a mut ConnectionStream, timeout: Duration) -> Self {
        Self {
            stream,
            expires: Instant::now() + timeout,
        }
    }
}

impl Read for Deadline<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.expires.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "request deadline elapsed",
            ));
        }
        self.stream.set_read_timeout(Some(remaining))?;
        self.stream.read(buf)
    }
}

impl Write for Deadline<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}
