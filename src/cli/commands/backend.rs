use crate::items::ApiTarget;
use clap::{Arg, ArgMatches, Command};

pub const ARG_BACKEND_URL: &str = "backend-url";
pub const ARG_API_MODE: &str = "api-mode";

#[derive(Debug, Clone)]
pub struct Options {
    pub url: String,
    pub target: ApiTarget,
}

impl Options {
    /// Parse backend API arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the backend URL is missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let url = match matches.get_one::<String>(ARG_BACKEND_URL) {
            Some(value) if !value.trim().is_empty() => value.trim().to_string(),
            _ => anyhow::bail!("missing required argument: --{ARG_BACKEND_URL}"),
        };

        Ok(Self {
            url,
            target: matches
                .get_one::<ApiTarget>(ARG_API_MODE)
                .copied()
                .unwrap_or_default(),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BACKEND_URL)
                .long(ARG_BACKEND_URL)
                .help("Items API base URL, example: https://api.example.com")
                .env("BASSOON_BACKEND_URL"),
        )
        .arg(
            Arg::new(ARG_API_MODE)
                .long(ARG_API_MODE)
                .help("direct: <backend-url>/api/v1 with cookies; proxy: <backend-url>/api without cookies")
                .env("BASSOON_API_MODE")
                .default_value("direct")
                .value_parser(|value: &str| value.parse::<ApiTarget>()),
        )
}
