use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{Output, Worker};
use crate::Result;
use crate::config::DropOnConfig;
use crate::error::Error;
use crate::handoff::{self, Intake};
use crate::message::Transaction;

mod conditions;
mod forwarder;

use forwarder::Forwarder;

/// DropOn wraps an [Output] and reports delivery failures upstream according to a
/// [DropOnConfig]:
///
/// - with `drop_on_error`, any error returned by the wrapped output is dropped and the message is
///   acknowledged as if it was delivered.
/// - with a `back_pressure_limit`, a message that could not be delivered within the limit is failed
///   with [Error::BackPressure]. Back pressure errors are always reported.
///
/// Messages are forwarded strictly one at a time, the wrapped output never holds more than one
/// message of this decorator.
pub struct DropOn<O> {
    config: DropOnConfig,
    output: O,
    cancel: CancellationToken,
    worker: Worker,
}

impl<O> DropOn<O>
where
    O: Output,
{
    pub fn new(config: DropOnConfig, output: O) -> Self {
        Self {
            config,
            output,
            cancel: CancellationToken::new(),
            worker: Worker::Idle,
        }
    }
}

impl<O> Output for DropOn<O>
where
    O: Output,
{
    fn consume(&mut self, transactions: Intake<Transaction>) -> Result<()> {
        if !self.worker.is_idle() {
            return Err(Error::AlreadyStarted);
        }

        let (handoff, intake) = handoff::channel();
        self.output.consume(intake)?;

        info!(
            drop_on_error = self.config.drop_on_error,
            back_pressure_limit = ?self.config.back_pressure_limit,
            "Starting drop on output"
        );
        let forwarder = Forwarder::new(transactions, handoff, self.config, self.cancel.clone());
        self.worker = Worker::Running(tokio::spawn(forwarder.run()));
        Ok(())
    }

    fn connected(&self) -> bool {
        self.output.connected()
    }

    fn close_async(&self) {
        self.cancel.cancel();
    }

    /// Waits for the in-flight message to be answered, then closes the wrapped output with whatever
    /// is left of the timeout.
    async fn wait_for_close(&mut self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        self.worker.join(deadline).await?;

        self.output.close_async();
        self.output
            .wait_for_close(deadline.saturating_duration_since(Instant::now()))
            .await
    }
}
