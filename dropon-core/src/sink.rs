use crate::Result;
use crate::message::Message;

/// A [BlackholeSink] which reads but never writes to anywhere, semantic equivalent of `/dev/null`.
mod blackhole;
pub use blackhole::BlackholeSink;

/// [LogSink] prints out the messages it receives.
mod log;
pub use log::LogSink;

/// Set of items to be implemented by a sink that writes messages one at a time. Wrap it in a
/// [SinkOutput](crate::output::SinkOutput) to use it as an [Output](crate::output::Output).
#[trait_variant::make(Sink: Send)]
#[allow(dead_code)]
pub trait LocalSink {
    /// Establishes the connection to the target. Called before the first write and again after a
    /// write returned [Error::NotConnected](crate::Error::NotConnected).
    async fn connect(&mut self) -> Result<()>;

    /// Writes a single message to the target.
    async fn write(&mut self, message: &Message) -> Result<()>;
}
