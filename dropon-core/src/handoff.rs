//! Rendezvous channel between two components. Unlike a bounded [mpsc] channel, nothing is ever
//! buffered: [Handoff::send] only completes once the [Intake] side has asked for the next item. An
//! output that is busy (or disconnected) therefore applies back pressure all the way upstream, and
//! an item that was not picked up can still be withdrawn by the sender.
//!
//! The receiver posts a one-shot "demand" slot, the sender waits for a demand and fills it.
//!
//! [mpsc]: tokio::sync::mpsc

use tokio::sync::{mpsc, oneshot};

/// Creates a connected [Handoff] and [Intake] pair.
pub fn channel<T>() -> (Handoff<T>, Intake<T>) {
    let (demand_tx, demand_rx) = mpsc::channel(1);
    (
        Handoff { demand: demand_rx },
        Intake {
            demand: demand_tx,
            pending: None,
        },
    )
}

/// Sending half of the rendezvous.
#[derive(Debug)]
pub struct Handoff<T> {
    demand: mpsc::Receiver<oneshot::Sender<T>>,
}

impl<T> Handoff<T> {
    /// Waits until the receiver is ready and hands the item over. The item is returned if the
    /// [Intake] was dropped.
    ///
    /// Cancel safe, if the future is dropped before completing the item was not handed over.
    pub async fn send(&mut self, mut item: T) -> Result<(), T> {
        loop {
            let Some(slot) = self.demand.recv().await else {
                return Err(item);
            };
            // the receiver may have given up on this demand, wait for the next one
            match slot.send(item) {
                Ok(()) => return Ok(()),
                Err(returned) => item = returned,
            }
        }
    }

    /// Returns true once the [Intake] has been dropped or closed.
    pub fn is_closed(&self) -> bool {
        self.demand.is_closed()
    }
}

/// Receiving half of the rendezvous.
#[derive(Debug)]
pub struct Intake<T> {
    demand: mpsc::Sender<oneshot::Sender<T>>,
    /// Demand posted by an earlier `recv` that has not been filled yet.
    pending: Option<oneshot::Receiver<T>>,
}

impl<T> Intake<T> {
    /// Asks the sender for the next item and waits for it. Returns `None` once the [Handoff] is
    /// dropped.
    ///
    /// Cancel safe, an item handed over after cancellation is returned by the next call.
    pub async fn recv(&mut self) -> Option<T> {
        if self.pending.is_none() {
            let (slot, item) = oneshot::channel();
            self.demand.send(slot).await.ok()?;
            self.pending = Some(item);
        }

        let item = match self.pending.as_mut() {
            Some(pending) => pending.await.ok(),
            None => None,
        };
        self.pending = None;
        item
    }

    /// Stops accepting items. If an outstanding demand was already filled, that item is returned
    /// so the caller can still answer it.
    pub fn close(mut self) -> Option<T> {
        let mut pending = self.pending.take()?;
        pending.close();
        pending.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn test_send_and_recv() {
        let (mut tx, mut rx) = channel();

        let receiver = tokio::spawn(async move {
            let mut received = vec![];
            while let Some(item) = rx.recv().await {
                received.push(item);
            }
            received
        });

        for i in 0..5 {
            tx.send(i).await.unwrap();
        }
        drop(tx);

        assert_eq!(receiver.await.unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_send_blocks_without_receiver_demand() {
        let (mut tx, _rx) = channel::<u32>();

        // nobody is asking for items, so the handoff can never complete
        let result = timeout(Duration::from_millis(50), tx.send(1)).await;
        assert!(result.is_err());
        assert!(!tx.is_closed());
    }

    #[tokio::test]
    async fn test_send_returns_item_when_intake_dropped() {
        let (mut tx, rx) = channel::<u32>();
        drop(rx);

        assert!(tx.is_closed());
        assert_eq!(tx.send(7).await, Err(7));
    }

    #[tokio::test]
    async fn test_recv_returns_none_when_handoff_dropped() {
        let (tx, mut rx) = channel::<u32>();
        drop(tx);

        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_cancelled_recv_keeps_item() {
        let (mut tx, mut rx) = channel::<u32>();

        // post a demand and give up on it
        assert!(timeout(Duration::from_millis(20), rx.recv()).await.is_err());

        // the sender fills the outstanding demand
        timeout(Duration::from_millis(100), tx.send(42))
            .await
            .expect("demand should be outstanding")
            .unwrap();

        // and the next recv picks it up
        assert_eq!(rx.recv().await, Some(42));
    }

    #[tokio::test]
    async fn test_close_returns_landed_item() {
        let (mut tx, mut rx) = channel::<u32>();

        assert!(timeout(Duration::from_millis(20), rx.recv()).await.is_err());
        tx.send(3).await.unwrap();

        assert_eq!(rx.close(), Some(3));
        assert_eq!(tx.send(4).await, Err(4));
    }

    #[tokio::test]
    async fn test_close_withdraws_demand() {
        let (mut tx, mut rx) = channel::<u32>();

        assert!(timeout(Duration::from_millis(20), rx.recv()).await.is_err());
        assert_eq!(rx.close(), None);

        // the stale demand is refused and the intake is gone
        assert_eq!(tx.send(5).await, Err(5));
    }
}
