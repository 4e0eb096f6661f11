use super::Sink;
use crate::{error, message::Message};

#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl LogSink {
    fn format(message: &Message) -> String {
        let mut headers = String::new();
        message.headers.iter().for_each(|(k, v)| {
            headers.push_str(&format!("{k}: {v}, "));
        });

        format!(
            "Payload - {} Headers - {} ID - {}",
            &String::from_utf8_lossy(&message.value),
            headers,
            message.id,
        )
    }
}

impl Sink for LogSink {
    async fn connect(&mut self) -> error::Result<()> {
        Ok(())
    }

    async fn write(&mut self, message: &Message) -> error::Result<()> {
        tracing::info!("{}", Self::format(message));
        Ok(())
    }
}
