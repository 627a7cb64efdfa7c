//! End-to-end tests running real sockets through the bootstrap.

use std::ffi::OsString;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use ortho_config::OrthoConfig;
use rstest::rstest;
use tracing::subscriber::NoSubscriber;

use quickfix_config::Config;

use crate::bootstrap::{ConfigLoader, RunningGateway, SystemConfigLoader, bootstrap_with};

use super::support::{
    ECHO_SERVICE, ECHO_TYPE, HealthEvent, RecordingHealthReporter, TcpConfigLoader, demo_chain,
    exchange, frame, split_response,
};

fn running() -> (RunningGateway, SocketAddr) {
    let reporter = Arc::new(RecordingHealthReporter::default());
    let gateway =
        bootstrap_with(&TcpConfigLoader, reporter, demo_chain()).expect("bootstrap gateway");
    let addr = gateway.local_addr().expect("tcp gateway address");
    (gateway, addr)
}

#[rstest]
fn echo_service_says_hi() {
    let (gateway, addr) = running();

    let response = exchange(
        addr,
        &frame(r#"{"server":"echoService","method":"say","args":["hi"]}"#),
    );

    assert_eq!(
        response,
        "HTTP/1.1 200 ok\r\nContent-Type:application/json\r\nContent-Length:8\r\n\r\necho: hi"
    );
    gateway.shutdown();
    gateway.join().expect("join listener");
}

#[rstest]
#[case::by_name(ECHO_SERVICE)]
#[case::by_type(ECHO_TYPE)]
fn expressions_reach_the_service(#[case] server: &str) {
    let (gateway, addr) = running();
    let body = format!(r#"{{"server":"{server}","expression":"name + ':' + counter"}}"#);

    let response = exchange(addr, &frame(&body));

    assert_eq!(split_response(&response).1, "echo:0");
    gateway.shutdown();
    gateway.join().expect("join listener");
}

#[rstest]
fn malformed_request_line_is_answered_without_dispatch() {
    let (gateway, addr) = running();

    let response = exchange(addr, "GET HTTP/1.1\r\n\r\n");

    let (status, body) = split_response(&response);
    assert_eq!(status, "HTTP/1.1 200 ok");
    assert!(
        body.starts_with("malformed request: malformed request line"),
        "unexpected body {body}"
    );
    gateway.shutdown();
    gateway.join().expect("join listener");
}

#[rstest]
fn unknown_servers_stay_unknown_across_calls() {
    let (gateway, addr) = running();
    let request = frame(r#"{"server":"ghost","method":"say","args":["hi"]}"#);

    for _ in 0..2 {
        let response = exchange(addr, &request);
        assert!(
            split_response(&response)
                .1
                .starts_with("error: server not found: ghost"),
            "unexpected response {response}"
        );
    }
    gateway.shutdown();
    gateway.join().expect("join listener");
}

#[rstest]
fn state_persists_between_connections() {
    let (gateway, addr) = running();
    let request = frame(r#"{"server":"echoService","method":"increment","args":[2]}"#);

    exchange(addr, &request);
    let response = exchange(addr, &request);

    assert_eq!(split_response(&response).1, "4");
    gateway.shutdown();
    gateway.join().expect("join listener");
}

#[rstest]
fn bootstrap_reports_listener_start() {
    let reporter = Arc::new(RecordingHealthReporter::default());
    let gateway = bootstrap_with(&TcpConfigLoader, reporter.clone(), demo_chain())
        .expect("bootstrap gateway");

    assert_eq!(
        reporter.events(),
        vec![
            HealthEvent::BootstrapStarting,
            HealthEvent::ListenerStarted("tcp://127.0.0.1:0".to_owned()),
            HealthEvent::BootstrapSucceeded,
        ]
    );
    gateway.shutdown();
    gateway.join().expect("join listener");
}

#[rstest]
fn concurrent_clients_share_one_registry() {
    const CLIENTS: i64 = 16;
    let (gateway, addr) = running();
    let request = frame(r#"{"server":"echoService","method":"increment","args":[1]}"#);

    let clients: Vec<_> = (0..CLIENTS)
        .map(|_| {
            let request = request.clone();
            thread::spawn(move || exchange(addr, &request))
        })
        .collect();
    let mut totals: Vec<i64> = clients
        .into_iter()
        .map(|client| {
            let response = client.join().expect("client thread");
            split_response(&response)
                .1
                .parse()
                .expect("increment returns a number")
        })
        .collect();
    totals.sort_unstable();

    assert_eq!(totals, (1..=CLIENTS).collect::<Vec<_>>());
    let counter = exchange(
        addr,
        &frame(r#"{"server":"echoService","expression":"counter"}"#),
    );
    assert_eq!(split_response(&counter).1, CLIENTS.to_string());
    gateway.shutdown();
    gateway.join().expect("join listener");
}

#[rstest]
fn system_loader_ignores_host_arguments() {
    // The test harness runs with its own argv, which the gateway must not
    // treat as gateway flags.
    let loaded = SystemConfigLoader.load().expect("load without host argv");
    let expected = Config::load_from_iter([OsString::from("quickfix")])
        .expect("load defaults, file and environment");

    assert_eq!(loaded, expected);
}

#[rstest]
fn bootstrap_runs_beside_a_host_subscriber() {
    let _ = tracing::subscriber::set_global_default(NoSubscriber::default());

    let (gateway, addr) = running();
    let response = exchange(
        addr,
        &frame(r#"{"server":"echoService","method":"say","args":["hi"]}"#),
    );

    assert_eq!(split_response(&response).1, "echo: hi");
    gateway.shutdown();
    gateway.join().expect("join listener");
}
