use super::Sink;
use crate::message::Message;

/// Blackhole is a sink to emulate /dev/null
#[derive(Debug, Default, Clone, Copy)]
pub struct BlackholeSink;

impl Sink for BlackholeSink {
    async fn connect(&mut self) -> crate::Result<()> {
        Ok(())
    }

    async fn write(&mut self, _message: &Message) -> crate::Result<()> {
        Ok(())
    }
}
