use std::error::Error;

use dropon_core::config::SinkOutputConfig;
use dropon_core::handoff;
use dropon_core::message::{Message, Transaction};
use dropon_core::metrics;
use dropon_core::output::{DropOn, Output, SinkOutput};
use dropon_core::sink::{BlackholeSink, LogSink, Sink};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::cmdline::{Settings, SinkKind};

mod cmdline;
mod setup_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    setup_tracing::register();

    if let Err(e) = run().await {
        error!("{e:?}");
        return Err(e);
    }
    info!("Exiting...");

    Ok(())
}

async fn run() -> Result<(), Box<dyn Error>> {
    let args = cmdline::root_cli().get_matches();
    let settings = Settings::from_matches(&args)?;
    info!(?settings, "Starting with settings");

    match settings.sink {
        SinkKind::Log => forward_stdin(LogSink, &settings).await?,
        SinkKind::Blackhole => forward_stdin(BlackholeSink, &settings).await?,
    }

    info!("Final metrics\n{}", metrics::encode_metrics()?);
    Ok(())
}

/// Sends every line read from stdin through the drop-on output until stdin ends or Ctrl-C is
/// pressed, then closes the output.
async fn forward_stdin<S>(sink: S, settings: &Settings) -> Result<(), Box<dyn Error>>
where
    S: Sink + 'static,
{
    let output = SinkOutput::new(sink, SinkOutputConfig::default());
    let mut drop_on = DropOn::new(settings.conditions, output);
    let (mut tx, rx) = handoff::channel();
    drop_on.consume(rx)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl-C, shutting down");
                break;
            }
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => {
                    info!("Reached end of input, shutting down");
                    break;
                }
            },
        };

        let (txn, reply) = Transaction::new(Message::new(line));
        let id = txn.message.id.clone();
        if tx.send(txn).await.is_err() {
            warn!("Output stopped consuming, shutting down");
            break;
        }
        match reply.await {
            Ok(Ok(())) => debug!(%id, "Message acknowledged"),
            Ok(Err(e)) => warn!(%id, %e, "Message failed"),
            Err(_) => warn!(%id, "Output dropped the reply"),
        }
    }

    drop_on.close_async();
    drop_on.wait_for_close(settings.shutdown_timeout).await?;
    Ok(())
}
