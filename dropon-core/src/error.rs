use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Synthesized by the drop-on output when the wrapped output did not answer in time. The text
    /// is matched on by callers, keep it stable.
    #[error("experienced back pressure beyond: {}", format_limit(.0))]
    BackPressure(Duration),

    #[error("type was already started")]
    AlreadyStarted,

    #[error("action timed out")]
    Timeout,

    #[error("type was closed")]
    TypeClosed,

    #[error("not connected to target source or sink")]
    NotConnected,

    #[error("Sink Error - {0}")]
    Sink(String),

    #[error("Config Error - {0}")]
    Config(String),

    #[error("metrics Error - {0}")]
    Metrics(String),

    #[error("OneShot Receiver Error - {0}")]
    ActorPatternRecv(String),
}

fn format_limit(limit: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*limit)
}
