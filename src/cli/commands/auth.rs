use clap::{builder::BoolishValueParser, Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_AUTH_URL: &str = "auth-url";
pub const ARG_AUTH_ANON_KEY: &str = "auth-anon-key";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";

#[derive(Debug, Clone)]
pub struct Options {
    pub url: String,
    pub anon_key: SecretString,
    pub cookie_secure: bool,
}

impl Options {
    /// Parse auth provider arguments from matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing or empty.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        // clap passes empty env values through; treat them as missing
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let Some(url) = get_non_empty(ARG_AUTH_URL) else {
            anyhow::bail!("missing required argument: --{ARG_AUTH_URL}");
        };
        let Some(anon_key) = get_non_empty(ARG_AUTH_ANON_KEY) else {
            anyhow::bail!("missing required argument: --{ARG_AUTH_ANON_KEY}");
        };

        Ok(Self {
            url,
            anon_key: SecretString::from(anon_key),
            cookie_secure: matches.get_flag(ARG_COOKIE_SECURE),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_AUTH_URL)
                .long(ARG_AUTH_URL)
                .help("Auth provider project URL, example: https://<project>.supabase.co")
                .env("PUBLIC_SUPABASE_URL"),
        )
        .arg(
            Arg::new(ARG_AUTH_ANON_KEY)
                .long(ARG_AUTH_ANON_KEY)
                .help("Auth provider public anon key")
                .env("PUBLIC_SUPABASE_ANON_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Mark session cookies Secure (enable when served over HTTPS)")
                .env("BASSOON_COOKIE_SECURE")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        )
}
