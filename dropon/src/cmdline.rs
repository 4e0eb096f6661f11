use std::time::Duration;

use clap::{Arg, ArgAction, ArgMatches, Command};
use dropon_core::config::DropOnConfig;

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub(super) fn root_cli() -> Command {
    Command::new("dropon")
        .about("Forwards lines from stdin to a sink, dropping failed deliveries on configured conditions")
        .arg(
            Arg::new("drop-on-error")
                .long("drop-on-error")
                .action(ArgAction::SetTrue)
                .help("Acknowledge messages the sink failed to write instead of reporting the error"),
        )
        .arg(
            Arg::new("back-pressure")
                .long("back-pressure")
                .value_name("DURATION")
                .value_parser(humantime::parse_duration)
                .help("Fail messages the sink did not take within this duration, e.g. 100ms"),
        )
        .arg(
            Arg::new("sink")
                .long("sink")
                .value_parser(["log", "blackhole"])
                .default_value("log")
                .help("Sink the messages are written to"),
        )
        .arg(
            Arg::new("shutdown-timeout")
                .long("shutdown-timeout")
                .value_name("DURATION")
                .value_parser(humantime::parse_duration)
                .default_value("5s")
                .help("Time given to in-flight messages on shutdown"),
        )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SinkKind {
    Log,
    Blackhole,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Settings {
    pub(super) conditions: DropOnConfig,
    pub(super) sink: SinkKind,
    pub(super) shutdown_timeout: Duration,
}

impl Settings {
    /// Conditions given on the command line take precedence, `DROPON_CONDITIONS` is only consulted
    /// when none are.
    pub(super) fn from_matches(args: &ArgMatches) -> dropon_core::Result<Self> {
        let drop_on_error = args.get_flag("drop-on-error");
        let back_pressure = args.get_one::<Duration>("back-pressure").copied();
        let conditions = if drop_on_error || back_pressure.is_some() {
            DropOnConfig::new(drop_on_error, back_pressure)
        } else {
            DropOnConfig::from_env()?
        };

        let sink = match args.get_one::<String>("sink").map(String::as_str) {
            Some("blackhole") => SinkKind::Blackhole,
            _ => SinkKind::Log,
        };

        Ok(Self {
            conditions,
            sink,
            shutdown_timeout: args
                .get_one::<Duration>("shutdown-timeout")
                .copied()
                .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT),
        })
    }
}
