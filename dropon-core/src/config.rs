use std::env;
use std::time::Duration;

use serde::Deserialize;

use crate::Result;
use crate::error::Error;

const ENV_DROP_ON_CONDITIONS: &str = "DROPON_CONDITIONS";
const DEFAULT_RECONNECT_INTERVAL_IN_MS: u64 = 1000;

/// DropOnSpec is the user facing form of the drop-on conditions, e.g.
///
/// ```json
/// { "error": true, "back_pressure": "100ms" }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct DropOnSpec {
    /// Whether messages that the wrapped output failed to deliver should be dropped instead of
    /// being reported as failed.
    pub error: bool,
    /// How long to wait for the wrapped output before giving up on a message, in humantime format
    /// ("100ms", "2s"). Empty disables the limit.
    pub back_pressure: String,
}

/// Validated drop-on conditions. Read only once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DropOnConfig {
    pub drop_on_error: bool,
    /// None means the wrapped output is waited on indefinitely.
    pub back_pressure_limit: Option<Duration>,
}

impl DropOnConfig {
    pub fn new(drop_on_error: bool, back_pressure_limit: Option<Duration>) -> Self {
        Self {
            drop_on_error,
            back_pressure_limit: back_pressure_limit.filter(|limit| !limit.is_zero()),
        }
    }

    /// Parses the conditions from their JSON form.
    pub fn load(obj: &str) -> Result<Self> {
        let spec: DropOnSpec = serde_json::from_str(obj)
            .map_err(|e| Error::Config(format!("Failed to parse drop-on conditions: {e}")))?;
        spec.try_into()
    }

    /// Loads the conditions from the `DROPON_CONDITIONS` environment variable, defaults if unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        match lookup(ENV_DROP_ON_CONDITIONS) {
            Some(obj) => Self::load(&obj),
            None => Ok(Self::default()),
        }
    }
}

impl TryFrom<DropOnSpec> for DropOnConfig {
    type Error = Error;

    fn try_from(spec: DropOnSpec) -> Result<Self> {
        let back_pressure = spec.back_pressure.trim();
        let back_pressure_limit = if back_pressure.is_empty() {
            None
        } else {
            Some(humantime::parse_duration(back_pressure).map_err(|e| {
                Error::Config(format!(
                    "Failed to parse back_pressure duration {back_pressure:?}: {e}"
                ))
            })?)
        };
        Ok(DropOnConfig::new(spec.error, back_pressure_limit))
    }
}

/// Configuration of a [SinkOutput](crate::output::SinkOutput).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkOutputConfig {
    /// Pause between two failed connection attempts.
    pub reconnect_interval: Duration,
}

impl Default for SinkOutputConfig {
    fn default() -> Self {
        Self {
            reconnect_interval: Duration::from_millis(DEFAULT_RECONNECT_INTERVAL_IN_MS),
        }
    }
}
