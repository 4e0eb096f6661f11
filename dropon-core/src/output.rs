use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::Result;
use crate::error::Error;
use crate::handoff::Intake;
use crate::message::Transaction;

/// [DropOn] wraps another [Output] and decides which delivery failures are reported upstream.
mod drop_on;
pub use drop_on::DropOn;

/// [SinkOutput] drives a [Sink](crate::sink::Sink) from an intake of transactions.
mod writer;
pub use writer::SinkOutput;

/// Output consumes [Transaction]s one at a time and answers each of them exactly once. Outputs
/// compose, a decorator is itself an [Output] consuming from upstream and feeding another one.
#[trait_variant::make(Output: Send)]
#[allow(dead_code)]
pub trait LocalOutput {
    /// Starts consuming from the intake. Can only be called once, subsequent calls return
    /// [Error::AlreadyStarted].
    fn consume(&mut self, transactions: Intake<Transaction>) -> Result<()>;

    /// Whether the output is currently connected to its target.
    fn connected(&self) -> bool;

    /// Signals the output to stop, does not block.
    fn close_async(&self);

    /// Waits for the output to stop. Returns [Error::Timeout] if it did not stop in time, the call
    /// can be repeated.
    async fn wait_for_close(&mut self, timeout: Duration) -> Result<()>;
}

/// Lifecycle of the task backing an output.
#[derive(Debug, Default)]
enum Worker {
    #[default]
    Idle,
    Running(JoinHandle<()>),
    Stopped,
}

impl Worker {
    fn is_idle(&self) -> bool {
        matches!(self, Worker::Idle)
    }

    /// Waits for the task to finish, giving up at the deadline. A task that has not been started
    /// counts as finished.
    async fn join(&mut self, deadline: Instant) -> Result<()> {
        if let Worker::Running(handle) = self {
            let joined = time::timeout_at(deadline, handle)
                .await
                .map_err(|_| Error::Timeout)?;
            *self = Worker::Stopped;
            joined.map_err(|e| Error::ActorPatternRecv(format!("output task failed: {e}")))?;
        }
        Ok(())
    }
}
