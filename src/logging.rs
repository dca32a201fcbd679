use std::io::IsTerminal as _;

use anyhow::Context as _;

/// Request spans from `tower_http` stay visible at the default level.
const DEFAULT_DIRECTIVES: &str = "info,tower_http=debug";

pub fn init() -> anyhow::Result<()> {
    init_with_default(DEFAULT_DIRECTIVES)
}

/// Installs the global subscriber; `RUST_LOG` wins over `default_directives`.
pub fn init_with_default(default_directives: &str) -> anyhow::Result<()> {
    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => tracing_subscriber::EnvFilter::try_new(default_directives)
            .with_context(|| format!("parse log directives: {default_directives}"))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("install tracing subscriber: {err}"))?;

    Ok(())
}
