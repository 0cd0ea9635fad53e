//! Log level selection: `-v` repeated, or a named `--log-level` that takes precedence.

use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::Level;

pub const ARG_VERBOSE: &str = "verbose";
pub const ARG_LOG_LEVEL: &str = "log-level";

fn parse_level(value: &str) -> Result<Level, String> {
    value.parse::<Level>().map_err(|_| {
        format!("invalid log level '{value}', expected error, warn, info, debug or trace")
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_VERBOSE)
                .short('v')
                .long(ARG_VERBOSE)
                .help("Raise the log level: -v warn, -vv info, -vvv debug, -vvvv trace")
                .global(true)
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new(ARG_LOG_LEVEL)
                .long(ARG_LOG_LEVEL)
                .help("Log level by name, overrides -v")
                .env("ANAGRAMS_LOG_LEVEL")
                .global(true)
                .value_parser(parse_level),
        )
}

/// Level for the default tracing directive. Errors only unless raised.
#[must_use]
pub fn level(matches: &ArgMatches) -> Level {
    if let Some(level) = matches.get_one::<Level>(ARG_LOG_LEVEL) {
        return *level;
    }

    match matches.get_count(ARG_VERBOSE) {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    }
}
