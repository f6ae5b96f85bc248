use crate::cli::{actions::Action, commands, dispatch::handler, telemetry};
use anyhow::Result;

fn get_verbosity_level(matches: &clap::ArgMatches) -> Option<tracing::Level> {
    match matches
        .get_one::<u8>(commands::logging::ARG_VERBOSITY)
        .map_or(0, |&v| v)
    {
        0 => None,
        1 => Some(tracing::Level::WARN),
        2 => Some(tracing::Level::INFO),
        3 => Some(tracing::Level::DEBUG),
        _ => Some(tracing::Level::TRACE),
    }
}

/// Parse arguments, install logging and resolve the action to run.
///
/// # Errors
/// Returns an error if logging cannot be initialized or arguments are incomplete.
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    telemetry::init(get_verbosity_level(&matches))?;

    handler(&matches)
}
