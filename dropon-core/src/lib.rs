//! Output decorator that decides which delivery failures of the output it wraps are reported
//! upstream. Transactions flow from upstream into [output::DropOn], which forwards them one at a
//! time to the wrapped [output::Output] and answers each of them exactly once:
//!
//! - errors of the wrapped output are reported, or dropped when configured to do so.
//! - a message the wrapped output could not take within the back pressure limit fails fast with
//!   [Error::BackPressure].

mod error;
pub use crate::error::{Error, Result};

/// Messages and the transactions carrying them between components.
pub mod message;

pub mod handoff;

pub mod config;

/// Prometheus metrics of the drop-on output.
pub mod metrics;

pub mod output;

pub mod sink;

#[cfg(test)]
mod test_utils;
