use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Output, Worker};
use crate::Result;
use crate::config::SinkOutputConfig;
use crate::error::Error;
use crate::handoff::Intake;
use crate::message::Transaction;
use crate::sink::Sink;

/// SinkOutput turns a [Sink] into an [Output]. The sink is driven by an actor task which only asks
/// for the next transaction while the sink is connected and idle, so a sink that cannot keep up (or
/// cannot connect) holds back its upstream instead of queueing messages.
pub struct SinkOutput<S> {
    sink: Option<S>,
    config: SinkOutputConfig,
    connected: Arc<AtomicBool>,
    cancel: CancellationToken,
    worker: Worker,
}

impl<S> SinkOutput<S>
where
    S: Sink + 'static,
{
    pub fn new(sink: S, config: SinkOutputConfig) -> Self {
        Self {
            sink: Some(sink),
            config,
            connected: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
            worker: Worker::Idle,
        }
    }
}

impl<S> Output for SinkOutput<S>
where
    S: Sink + 'static,
{
    fn consume(&mut self, transactions: Intake<Transaction>) -> Result<()> {
        let Some(sink) = self.sink.take() else {
            return Err(Error::AlreadyStarted);
        };

        let actor = SinkActor {
            intake: transactions,
            sink,
            connected: Arc::clone(&self.connected),
            reconnect_interval: self.config.reconnect_interval,
            cancel: self.cancel.clone(),
        };
        self.worker = Worker::Running(tokio::spawn(actor.run()));
        Ok(())
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn close_async(&self) {
        self.cancel.cancel();
    }

    async fn wait_for_close(&mut self, timeout: Duration) -> Result<()> {
        self.worker.join(Instant::now() + timeout).await
    }
}

/// SinkActor owns the sink and answers every transaction it takes from the intake.
struct SinkActor<S> {
    intake: Intake<Transaction>,
    sink: S,
    connected: Arc<AtomicBool>,
    reconnect_interval: Duration,
    cancel: CancellationToken,
}

impl<S> SinkActor<S>
where
    S: Sink,
{
    /// Connects the sink, retrying until it succeeds. Returns false if cancelled meanwhile.
    async fn ensure_connected(&mut self) -> bool {
        while !self.connected.load(Ordering::Relaxed) {
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return false,
                result = self.sink.connect() => result,
            };

            match result {
                Ok(()) => {
                    info!("Sink connected");
                    self.connected.store(true, Ordering::Relaxed);
                }
                Err(e) => {
                    warn!(?e, retry_in = ?self.reconnect_interval, "Failed to connect sink");
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return false,
                        _ = time::sleep(self.reconnect_interval) => {}
                    }
                }
            }
        }
        true
    }

    async fn run(mut self) {
        loop {
            if !self.ensure_connected().await {
                break;
            }

            let txn = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                txn = self.intake.recv() => match txn {
                    Some(txn) => txn,
                    None => {
                        debug!("Transaction intake closed, stopping sink");
                        break;
                    }
                },
            };

            let Transaction { message, reply } = txn;
            let result = self.sink.write(&message).await;
            if let Err(Error::NotConnected) = result {
                warn!(id = %message.id, "Sink lost its connection");
                self.connected.store(false, Ordering::Relaxed);
            }
            if reply.send(result).is_err() {
                debug!(id = %message.id, "Reply receiver dropped before the write completed");
            }
        }

        self.connected.store(false, Ordering::Relaxed);
        if let Some(txn) = self.intake.close() {
            let _ = txn.reply.send(Err(Error::TypeClosed));
        }
    }
}
