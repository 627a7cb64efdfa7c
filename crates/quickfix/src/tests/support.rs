//! Shared fixtures for the gateway test suites.

use std::ffi::OsString;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use quickfix_config::{Config, SocketEndpoint};

use crate::bootstrap::{BootstrapError, ConfigLoader};
use crate::endpoint::{EndpointChain, RegistryEndpoint};
use crate::health::HealthReporter;
use crate::reflect::{ArgKind, TypeDescriptor, Value};
use crate::registry::Registry;

pub const ECHO_TYPE: &str = "demo.EchoService";
pub const ECHO_SERVICE: &str = "echoService";

/// Inspectable demo service.
#[derive(Debug, Default)]
pub struct EchoService {
    counter: AtomicI64,
}

fn echo_descriptor() -> TypeDescriptor {
    TypeDescriptor::builder::<EchoService>(ECHO_TYPE)
        .method("say", &[ArgKind::Str], |_service, args| {
            Ok(Value::from(format!("echo: {}", args.str(0)?)))
        })
        .method("increment", &[ArgKind::Int], |service, args| {
            let by = args.int(0)?;
            Ok(Value::from(
                service.counter.fetch_add(by, Ordering::SeqCst) + by,
            ))
        })
        .method("fail", &[], |_service, _args| {
            Err("deliberate failure".into())
        })
        .property("counter", |service| {
            Value::from(service.counter.load(Ordering::SeqCst))
        })
        .property("name", |_service| Value::from("echo"))
        .build()
}

/// Registry holding one [`EchoService`] under [`ECHO_SERVICE`].
pub fn demo_registry() -> Arc<Registry> {
    let mut builder = Registry::builder();
    builder
        .register_type(echo_descriptor())
        .and_then(|builder| {
            builder.register_service(ECHO_SERVICE, ECHO_TYPE, EchoService::default())
        })
        .expect("register demo service");
    Arc::new(builder.build())
}

/// Chain answering from [`demo_registry`].
pub fn demo_chain() -> EndpointChain {
    let mut builder = EndpointChain::builder();
    builder.register(RegistryEndpoint::from_registry(demo_registry()));
    builder.build()
}

/// Frames `body` as a POST request.
pub fn frame(body: &str) -> String {
    format!(
        "POST /fix HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    )
}

/// Sends `request` over TCP and reads until the gateway closes.
pub fn exchange(addr: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).expect("connect to gateway");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("set client timeout");
    stream
        .write_all(request.as_bytes())
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .expect("read response");
    response
}

/// Splits a response into its status line and body.
pub fn split_response(response: &str) -> (&str, &str) {
    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("response should carry a blank line");
    let status = head.lines().next().unwrap_or_default();
    (status, body)
}

/// Health events captured during a scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    ListenerStarted(String),
    BootstrapSucceeded,
    BootstrapFailed(String),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn listener_started(&self, endpoint: &SocketEndpoint, _local_addr: Option<SocketAddr>) {
        self.record(HealthEvent::ListenerStarted(endpoint.to_string()));
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }
}

/// Loader listening on an ephemeral loopback port.
#[derive(Debug, Default)]
pub struct TcpConfigLoader;

impl ConfigLoader for TcpConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            listen_socket: SocketEndpoint::tcp("127.0.0.1", 0),
            read_timeout_ms: 2_000,
            ..Config::default()
        })
    }
}

/// Loader placing a Unix socket in a nested temporary directory.
pub struct UnixConfigLoader {
    socket_dir: TempDir,
}

impl UnixConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            socket_dir: TempDir::new().expect("create socket directory"),
        }
    }

    pub fn socket_path(&self) -> String {
        let path = self.socket_dir.path().join("run").join("quickfix.sock");
        path.to_str()
            .expect("temporary socket path was not valid UTF-8")
            .to_owned()
    }
}

impl ConfigLoader for UnixConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            listen_socket: SocketEndpoint::unix(self.socket_path()),
            ..Config::default()
        })
    }
}

/// Loader that fails by passing an unsupported socket scheme.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("quickfix"),
            OsString::from("--listen-socket"),
            OsString::from("invalid://socket"),
        ];
        Config::load_from_iter(args)
    }
}
