//! Tests for the socket listener.

use std::net::TcpStream;
use std::thread;
use std::time::{Duration, Instant};

use rstest::{fixture, rstest};

use quickfix_config::SocketEndpoint;

use super::{ListenerError, SessionRecorder, SocketListener};

#[fixture]
fn tcp_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", 0)
}

fn eventually(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

#[rstest]
fn tcp_listener_serves_each_client(tcp_endpoint: SocketEndpoint) {
    let listener = SocketListener::bind(&tcp_endpoint).expect("bind tcp listener");
    let addr = listener.local_addr().expect("listener should report local address");
    assert_ne!(addr.port(), 0, "ephemeral port should be assigned");
    let recorder = SessionRecorder::new();
    let handle = listener.start(recorder.clone()).expect("start listener");

    drop(TcpStream::connect(addr).expect("connect first client"));
    drop(TcpStream::connect(addr).expect("connect second client"));

    assert!(eventually(|| recorder.started() == 2), "expected two sessions");
    handle.shutdown();
    handle.join().expect("join listener");
}

#[rstest]
fn connection_limit_holds_extra_clients_in_the_backlog(tcp_endpoint: SocketEndpoint) {
    let listener = SocketListener::bind(&tcp_endpoint)
        .expect("bind tcp listener")
        .with_connection_limit(1);
    let addr = listener.local_addr().expect("local address");
    let recorder = SessionRecorder::new();
    let handle = listener.start(recorder.clone()).expect("start listener");

    let first = TcpStream::connect(addr).expect("connect first client");
    let second = TcpStream::connect(addr).expect("connect second client");
    assert!(eventually(|| recorder.started() == 1), "first session should start");
    thread::sleep(Duration::from_millis(200));
    assert_eq!(recorder.started(), 1, "second client must wait for a slot");

    drop(first);
    assert!(
        eventually(|| recorder.started() == 2),
        "second session should start once the slot frees"
    );
    drop(second);
    assert_eq!(recorder.peak(), 1);

    handle.shutdown();
    handle.join().expect("join listener");
}

#[rstest]
fn zero_connection_limit_still_serves_one(tcp_endpoint: SocketEndpoint) {
    let listener = SocketListener::bind(&tcp_endpoint)
        .expect("bind tcp listener")
        .with_connection_limit(0);
    let addr = listener.local_addr().expect("local address");
    let recorder = SessionRecorder::new();
    let handle = listener.start(recorder.clone()).expect("start listener");

    drop(TcpStream::connect(addr).expect("connect client"));

    assert!(eventually(|| recorder.started() == 1), "client should be served");
    handle.shutdown();
    handle.join().expect("join listener");
}

#[rstest]
fn tcp_listener_reports_bind_conflicts(tcp_endpoint: SocketEndpoint) {
    let first = SocketListener::bind(&tcp_endpoint).expect("bind first listener");
    let port = first.local_addr().expect("first address").port();

    let error = SocketListener::bind(&SocketEndpoint::tcp("127.0.0.1", port))
        .expect_err("port is taken");
    assert!(matches!(error, ListenerError::BindTcp { .. }));
}

#[rstest]
fn shutdown_closes_the_socket(tcp_endpoint: SocketEndpoint) {
    let listener = SocketListener::bind(&tcp_endpoint).expect("bind tcp listener");
    let addr = listener.local_addr().expect("local address");
    let recorder = SessionRecorder::new();
    let handle = listener.start(recorder.clone()).expect("start listener");

    handle.shutdown();
    handle.join().expect("join listener");

    assert!(
        TcpStream::connect_timeout(&addr, Duration::from_millis(200)).is_err(),
        "listener socket should be closed after join"
    );
    assert_eq!(recorder.started(), 0);
}

#[cfg(unix)]
mod unix {
    use std::os::unix::net::{UnixListener, UnixStream};

    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::*;

    #[fixture]
    fn socket_dir() -> TempDir {
        tempfile::tempdir().expect("temp dir")
    }

    fn endpoint_in(dir: &TempDir) -> (std::path::PathBuf, SocketEndpoint) {
        let path = dir.path().join("quickfix.sock");
        let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path"));
        (path, endpoint)
    }

    #[rstest]
    fn reclaims_stale_socket_and_removes_it_on_shutdown(socket_dir: TempDir) {
        let (path, endpoint) = endpoint_in(&socket_dir);
        drop(UnixListener::bind(&path).expect("bind stale listener"));
        assert!(path.exists(), "stale socket should remain");

        let listener = SocketListener::bind(&endpoint).expect("bind new listener");
        assert!(listener.local_addr().is_none());
        let recorder = SessionRecorder::new();
        let handle = listener.start(recorder.clone()).expect("start listener");

        drop(UnixStream::connect(&path).expect("connect unix client"));
        assert!(eventually(|| recorder.started() == 1), "expected one session");

        handle.shutdown();
        handle.join().expect("join listener");
        assert!(!path.exists(), "socket file should be removed on shutdown");
    }

    #[rstest]
    fn refuses_a_socket_that_still_answers(socket_dir: TempDir) {
        let (path, endpoint) = endpoint_in(&socket_dir);
        let _live = UnixListener::bind(&path).expect("bind live listener");

        let error = SocketListener::bind(&endpoint).expect_err("socket is in use");
        assert!(matches!(error, ListenerError::UnixInUse { .. }));
    }

    #[rstest]
    fn refuses_regular_files(socket_dir: TempDir) {
        let (path, endpoint) = endpoint_in(&socket_dir);
        std::fs::write(&path, b"not a socket").expect("write regular file");

        let error = SocketListener::bind(&endpoint).expect_err("path is not a socket");
        assert!(matches!(error, ListenerError::UnixNotSocket { .. }));
        assert!(path.exists(), "regular file must be left alone");
    }
}
