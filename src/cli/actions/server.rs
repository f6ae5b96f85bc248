use crate::{
    cli::{
        commands::{auth, backend},
        telemetry,
    },
    gateway::Gateway,
    items::ItemsClient,
    session::{AuthClient, AuthConfig},
};
use anyhow::{Context, Result};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub base_path: String,
    pub dev: bool,
    pub auth: auth::Options,
    pub backend: backend::Options,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the upstream URLs are invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let config = AuthConfig::new(&args.auth.url, args.auth.anon_key)
        .context("invalid auth provider URL")?
        .with_cookie_secure(args.auth.cookie_secure);
    let auth = AuthClient::new(config).context("failed to build auth client")?;

    let items = ItemsClient::new(&args.backend.url, args.backend.target)
        .context("invalid backend URL")?;

    let result = Gateway::new(auth, items)
        .with_base_path(&args.base_path)
        .with_dev(args.dev)
        .serve(args.port)
        .await;

    telemetry::shutdown_tracer();

    result
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("base_path", display_or(&args.base_path, "/")),
        ("auth_url", args.auth.url.clone()),
        ("backend_url", args.backend.url.clone()),
        ("api_mode", args.backend.target.to_string()),
        ("cookie_secure", args.auth.cookie_secure.to_string()),
        ("dev", args.dev.to_string()),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn display_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
