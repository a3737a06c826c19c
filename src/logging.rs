//! Tracing setup for the command-line binary.
//!
//! Diagnostics go to stderr so command output on stdout stays clean.

use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info,sqlx=warn";

/// Installs the global subscriber. `RUST_LOG` overrides the default filter;
/// `verbose` raises this crate to debug.
pub fn init(verbose: bool) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if verbose => EnvFilter::try_new("debug,sqlx=warn,hyper=info,reqwest=info")?,
        Err(_) => EnvFilter::try_new(DEFAULT_FILTER)?,
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))?;
    Ok(())
}
