//! Forwarder moves transactions from upstream to the wrapped output one at a time, and answers
//! each of them upstream exactly once:
//!
//! ```text
//! upstream --(handoff)--> Forwarder --(handoff)--> wrapped output
//!    ^                        |                          |
//!    +---- evaluated reply ---+<------- reply -----------+
//! ```
//!
//! With a back pressure limit, the time between accepting a transaction from upstream and
//! answering it is bounded by the limit. If the limit is hit before the wrapped output accepted the
//! message, the message is withdrawn and never reaches it. If the limit is hit while the wrapped
//! output is working on it, the eventual reply is drained in the background and the next message
//! is not handed over until that happened, so the wrapped output never has two messages at once.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::conditions::{self, Outcome};
use crate::Result;
use crate::config::DropOnConfig;
use crate::error::Error;
use crate::handoff::{Handoff, Intake};
use crate::message::{Message, ReplyReceiver, Response, Transaction};
use crate::metrics::drop_on_metrics;

/// A message handed to the wrapped output whose reply has not been observed yet.
struct PendingForward {
    started: Instant,
    reply: ReplyReceiver,
}

impl PendingForward {
    async fn reply(&mut self) -> Response {
        (&mut self.reply).await.unwrap_or_else(|e| {
            Err(Error::ActorPatternRecv(format!(
                "wrapped output dropped the reply: {e}"
            )))
        })
    }

    /// Waits for the reply of a message that was already answered upstream and discards it.
    async fn discard(self, id: String) {
        match self.reply.await {
            Ok(reply) => {
                drop_on_metrics().late_reply_total.inc();
                debug!(%id, elapsed = ?self.started.elapsed(), ?reply, "Discarding late reply");
            }
            Err(_) => debug!(%id, "Wrapped output dropped the reply of a timed out message"),
        }
    }
}

pub(super) struct Forwarder {
    upstream: Intake<Transaction>,
    output: Handoff<Transaction>,
    config: DropOnConfig,
    cancel: CancellationToken,
    /// Watcher draining the reply of the last message that hit the back pressure limit.
    lagging: Option<JoinHandle<()>>,
    /// Set during a streak of back pressure timeouts, only the first one of a streak is a warning.
    back_pressured: bool,
}

impl Forwarder {
    pub(super) fn new(
        upstream: Intake<Transaction>,
        output: Handoff<Transaction>,
        config: DropOnConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            upstream,
            output,
            config,
            cancel,
            lagging: None,
            back_pressured: false,
        }
    }

    /// Runs until cancelled, until upstream goes away, or until the wrapped output stops accepting
    /// messages. A message that was accepted is always answered before returning. Once the wrapped
    /// output took a message, its race runs to completion even when cancelled.
    pub(super) async fn run(mut self) {
        loop {
            let txn = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("Shutdown signal received, stopping forwarder");
                    break;
                }
                txn = self.upstream.recv() => match txn {
                    Some(txn) => txn,
                    None => {
                        debug!("Upstream closed, stopping forwarder");
                        break;
                    }
                },
            };

            let accepted = Instant::now();
            let Transaction { message, reply } = txn;
            let id = message.id.clone();

            let (response, output_closed) = match self.forward(message, accepted).await {
                Ok(response) => (response, false),
                Err(e) if self.cancel.is_cancelled() => {
                    debug!(%id, "Message withdrawn before the wrapped output took it");
                    (Err(e), true)
                }
                Err(e) => {
                    error!(?e, %id, "Wrapped output stopped accepting messages");
                    (Err(e), true)
                }
            };
            drop_on_metrics()
                .forward_time
                .observe(accepted.elapsed().as_micros() as f64);

            if reply.send(response).is_err() {
                warn!(%id, "Upstream dropped the reply receiver");
            }
            if output_closed {
                break;
            }
        }

        // a transaction may have been handed over right as we stopped
        if let Some(txn) = self.upstream.close() {
            let _ = txn.reply.send(Err(Error::TypeClosed));
        }
    }

    /// Forwards a single message and returns what to answer upstream. Errors only if the wrapped
    /// output is gone, or if shutdown withdrew the message before it was handed over.
    async fn forward(&mut self, message: Message, accepted: Instant) -> Result<Response> {
        // a limit too large to represent as a deadline is as good as none
        let budget = self
            .config
            .back_pressure_limit
            .and_then(|limit| Some((limit, accepted.checked_add(limit)?)));
        let id = message.id.clone();
        let (txn, reply) = Transaction::new(message);

        match budget {
            Some((limit, deadline)) => {
                match time::timeout_at(deadline, self.hand_off(txn)).await {
                    Ok(handed_off) => handed_off?,
                    // never reached the wrapped output, dropping the future withdrew it
                    Err(_) => return Ok(self.back_pressure(limit, &id)),
                }
            }
            None => self.hand_off(txn).await?,
        }
        drop_on_metrics().forwarded_total.inc();

        let mut pending = PendingForward {
            started: Instant::now(),
            reply,
        };
        let reply = match budget {
            Some((limit, deadline)) => match time::timeout_at(deadline, pending.reply()).await {
                Ok(reply) => reply,
                Err(_) => {
                    self.lagging = Some(tokio::spawn(pending.discard(id.clone())));
                    return Ok(self.back_pressure(limit, &id));
                }
            },
            None => pending.reply().await,
        };

        if self.back_pressured {
            info!(%id, "Wrapped output recovered from back pressure");
            self.back_pressured = false;
        }

        let outcome = conditions::evaluate(&self.config, reply);
        if let Outcome::Dropped(e) = &outcome {
            debug!(%id, ?e, "Dropping message due to error");
            drop_on_metrics().dropped_total.inc();
        }
        Ok(outcome.into_response())
    }

    /// Hands the transaction to the wrapped output once it is done with the previous one. Shutting
    /// down withdraws a transaction the wrapped output has not taken yet.
    async fn hand_off(&mut self, txn: Transaction) -> Result<()> {
        let Self {
            output,
            cancel,
            lagging,
            ..
        } = self;

        let handed_off = async {
            if let Some(watcher) = lagging.as_mut() {
                let _ = watcher.await;
            }
            *lagging = None;
            output.send(txn).await.map_err(|_| Error::TypeClosed)
        };

        tokio::select! {
            biased;
            result = handed_off => result,
            _ = cancel.cancelled() => {
                debug!("Shutdown signal received while waiting for the wrapped output");
                Err(Error::TypeClosed)
            }
        }
    }

    fn back_pressure(&mut self, limit: Duration, id: &str) -> Response {
        drop_on_metrics().back_pressure_total.inc();
        if self.back_pressured {
            debug!(%id, ?limit, "Message failed due to back pressure");
        } else {
            warn!(%id, ?limit, "Wrapped output is applying back pressure, failing messages");
            self.back_pressured = true;
        }
        Err(Error::BackPressure(limit))
    }
}
