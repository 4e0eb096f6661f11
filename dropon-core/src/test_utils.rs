//! Controllable sink for exercising outputs under failure.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::message::Message;
use crate::sink::Sink;

/// Shared state of a [TestSink], the test keeps a handle to flip conditions while the sink is
/// owned by the output under test.
#[derive(Debug, Default)]
pub(crate) struct TestSinkState {
    /// Payloads of the messages written successfully, in order.
    received: Mutex<Vec<String>>,
    /// Refuse connection attempts while set.
    unreachable: AtomicBool,
    /// Fail every write with a connection error while set, without losing the connection.
    disconnected: AtomicBool,
    /// Fail every write with this error.
    fail_with: Mutex<Option<Error>>,
    /// Artificial write latency in milliseconds.
    write_latency_ms: AtomicU64,
    connects: AtomicU64,
}

impl TestSinkState {
    pub(crate) fn received(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    pub(crate) fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub(crate) fn set_disconnected(&self, disconnected: bool) {
        self.disconnected.store(disconnected, Ordering::SeqCst);
    }

    pub(crate) fn fail_with(&self, error: Option<Error>) {
        *self.fail_with.lock() = error;
    }

    pub(crate) fn set_write_latency(&self, latency: Duration) {
        self.write_latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    pub(crate) fn connects(&self) -> u64 {
        self.connects.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default, Clone)]
pub(crate) struct TestSink {
    state: Arc<TestSinkState>,
}

impl TestSink {
    pub(crate) fn new() -> (Self, Arc<TestSinkState>) {
        let sink = Self::default();
        let state = Arc::clone(&sink.state);
        (sink, state)
    }
}

impl Sink for TestSink {
    async fn connect(&mut self) -> Result<()> {
        if self.state.unreachable.load(Ordering::SeqCst) {
            return Err(Error::Sink("connection refused".to_string()));
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn write(&mut self, message: &Message) -> Result<()> {
        let latency = self.state.write_latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.state.disconnected.load(Ordering::SeqCst) {
            return Err(Error::Sink("connection reset by peer".to_string()));
        }
        if let Some(error) = self.state.fail_with.lock().clone() {
            return Err(error);
        }
        self.state
            .received
            .lock()
            .push(String::from_utf8_lossy(&message.value).into_owned());
        Ok(())
    }
}
