use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::error::Error;

/// Outcome of delivering a [Message], `Ok(())` acknowledges it.
pub type Response = std::result::Result<(), Error>;

/// Receiving half of a [Transaction]'s reply slot.
pub type ReplyReceiver = oneshot::Receiver<Response>;

/// Message is the unit of data flowing through an output. The payload is opaque to the outputs
/// that only route it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Message {
    /// Unique identifier, only used for tracing.
    pub id: String,
    pub value: Bytes,
    pub headers: HashMap<String, String>,
}

impl Message {
    pub fn new(value: impl Into<Bytes>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            value: value.into(),
            headers: HashMap::new(),
        }
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Message {{ id: {}, value: {} }}",
            self.id,
            String::from_utf8_lossy(&self.value)
        )
    }
}

/// Transaction pairs a [Message] with the one-shot slot its [Response] must be written to. Whoever
/// accepts a transaction owes exactly one reply, sending consumes the slot so a second reply cannot
/// be written.
#[derive(Debug)]
pub struct Transaction {
    pub message: Message,
    pub reply: oneshot::Sender<Response>,
}

impl Transaction {
    /// Creates a transaction along with the receiver the reply will arrive on.
    pub fn new(message: Message) -> (Self, ReplyReceiver) {
        let (reply, receiver) = oneshot::channel();
        (Self { message, reply }, receiver)
    }
}
