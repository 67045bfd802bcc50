use clap::{builder::ValueParser, Arg, ArgAction, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names accepted by `LECTERN_LOG_LEVEL`, indexed by verbosity count.
const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Highest numeric verbosity accepted from the environment.
const MAX_VERBOSITY: u8 = 5;

/// Parse a level given by name (any case) or as a count up to `MAX_VERBOSITY`.
fn parse_log_level(level: &str) -> Result<u8, String> {
    if let Ok(count) = level.parse::<u8>() {
        return if count <= MAX_VERBOSITY {
            Ok(count)
        } else {
            Err(format!("log level must be at most {MAX_VERBOSITY}"))
        };
    }

    let level = level.to_ascii_lowercase();
    (0u8..)
        .zip(LEVEL_NAMES)
        .find_map(|(count, name)| (name == level).then_some(count))
        .ok_or_else(|| format!("invalid log level, expected one of: {}", LEVEL_NAMES.join(", ")))
}

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(parse_log_level)
}

/// `-v` repeats or `LECTERN_LOG_LEVEL`, available to every subcommand.
#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("LECTERN_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}
