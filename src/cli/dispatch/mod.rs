use crate::cli::{
    actions::{server::Args, Action},
    commands::{self, auth, backend},
};
use anyhow::Result;

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches
        .get_one::<u16>(commands::ARG_PORT)
        .copied()
        .unwrap_or(8080);
    let base_path = matches
        .get_one::<String>(commands::ARG_BASE_PATH)
        .cloned()
        .unwrap_or_default();

    Ok(Action::Server(Args {
        port,
        base_path,
        dev: matches.get_flag(commands::ARG_DEV),
        auth: auth::Options::parse(matches)?,
        backend: backend::Options::parse(matches)?,
    }))
}
