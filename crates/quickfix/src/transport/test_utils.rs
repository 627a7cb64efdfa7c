//! Connection handlers for listener tests.

use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{ConnectionHandler, ConnectionStream};

/// Holds each connection open until the peer hangs up, recording how many
/// sessions started and how many overlapped.
#[derive(Default)]
pub(crate) struct SessionRecorder {
    started: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl SessionRecorder {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl ConnectionHandler for SessionRecorder {
    fn handle(&self, mut stream: ConnectionStream) {
        self.started.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);

        let mut sink = Vec::new();
        let _ = stream.read_to_end(&mut sink);

        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}
