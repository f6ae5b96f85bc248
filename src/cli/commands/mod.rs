pub mod auth;
pub mod backend;
pub mod logging;

use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        BoolishValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

pub const ARG_PORT: &str = "port";
pub const ARG_BASE_PATH: &str = "base-path";
pub const ARG_DEV: &str = "dev";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("bassoon")
        .about("Session-aware gateway for the items API")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("BASSOON_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_BASE_PATH)
                .long(ARG_BASE_PATH)
                .help("Path prefix the app is served under, example: /ui-cautious-bassoon")
                .env("BASSOON_BASE_PATH")
                .default_value(""),
        )
        .arg(
            Arg::new(ARG_DEV)
                .long(ARG_DEV)
                .help("Development mode: answer browser devtools probes with 404")
                .env("BASSOON_DEV")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        );

    let command = auth::with_args(command);
    let command = backend::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::ApiTarget;
    use secrecy::ExposeSecret;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "bassoon");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("Session-aware gateway for the items API".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_check_args() {
        temp_env::with_vars(
            [
                ("BASSOON_API_MODE", None::<&str>),
                ("BASSOON_DEV", None::<&str>),
            ],
            || {
                let command = new();
                let matches = command.get_matches_from(vec![
                    "bassoon",
                    "--port",
                    "3000",
                    "--auth-url",
                    "https://project.supabase.co",
                    "--auth-anon-key",
                    "anon",
                    "--backend-url",
                    "https://api.example.com",
                    "--base-path",
                    "/ui-cautious-bassoon",
                    "--dev",
                ]);

                assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(3000));
                assert_eq!(
                    matches.get_one::<String>(ARG_BASE_PATH).cloned(),
                    Some("/ui-cautious-bassoon".to_string())
                );
                assert!(matches.get_flag(ARG_DEV));

                let auth = auth::Options::parse(&matches).unwrap_or_else(|e| panic!("{e}"));
                assert_eq!(auth.url, "https://project.supabase.co");
                assert_eq!(auth.anon_key.expose_secret(), "anon");

                let backend = backend::Options::parse(&matches).unwrap_or_else(|e| panic!("{e}"));
                assert_eq!(backend.url, "https://api.example.com");
                assert_eq!(backend.target, ApiTarget::Direct);
            },
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("PUBLIC_SUPABASE_URL", Some("https://project.supabase.co")),
                ("PUBLIC_SUPABASE_ANON_KEY", Some("anon")),
                ("BASSOON_BACKEND_URL", Some("https://proxy.example.com")),
                ("BASSOON_API_MODE", Some("proxy")),
                ("BASSOON_PORT", Some("443")),
                ("BASSOON_DEV", Some("true")),
                ("BASSOON_COOKIE_SECURE", Some("yes")),
                ("BASSOON_LOG_LEVEL", Some("info")),
            ],
            || {
                let command = new();
                let matches = command.get_matches_from(vec!["bassoon"]);
                assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(443));
                assert!(matches.get_flag(ARG_DEV));
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );

                let auth = auth::Options::parse(&matches).unwrap_or_else(|e| panic!("{e}"));
                assert!(auth.cookie_secure);

                let backend = backend::Options::parse(&matches).unwrap_or_else(|e| panic!("{e}"));
                assert_eq!(backend.target, ApiTarget::Proxy);
            },
        );
    }

    #[test]
    fn test_missing_auth_url() {
        temp_env::with_vars(
            [
                ("PUBLIC_SUPABASE_URL", None::<&str>),
                ("PUBLIC_SUPABASE_ANON_KEY", Some("anon")),
            ],
            || {
                let matches = new().get_matches_from(vec!["bassoon"]);
                let result = auth::Options::parse(&matches);
                assert!(result.is_err());
                if let Err(err) = result {
                    assert!(err
                        .to_string()
                        .contains("missing required argument: --auth-url"));
                }
            },
        );
    }

    #[test]
    fn test_invalid_api_mode() {
        let result = new().try_get_matches_from(vec!["bassoon", "--api-mode", "sideways"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_check_log_level_env() {
        // loop cover all possible value_parse
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars([("BASSOON_LOG_LEVEL", Some(level))], || {
                let command = new();
                let matches = command.get_matches_from(vec!["bassoon"]);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        for index in 0..5_usize {
            temp_env::with_vars([("BASSOON_LOG_LEVEL", None::<String>)], || {
                let mut args = vec!["bassoon".to_string()];

                // Add the appropriate number of "-v" flags based on the index
                if index > 0 {
                    args.push(format!("-{}", "v".repeat(index)));
                }

                let matches = new().get_matches_from(args);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }
}
