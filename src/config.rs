use std::time::Duration;

use anyhow::Context;

pub const DEFAULT_API_BASE: &str = "http://localhost:4000";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base: String,
    pub http_timeout: Duration,
    pub database_url: Option<String>,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let api_base = lookup("TRAINING_API_BASE")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let http_timeout = match lookup("TRAINING_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("TRAINING_HTTP_TIMEOUT_SECS must be whole seconds, got '{raw}'"))?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Ok(Self {
            api_base,
            http_timeout: Duration::from_secs(http_timeout),
            database_url: lookup("DATABASE_URL").filter(|value| !value.trim().is_empty()),
        })
    }

    pub fn require_database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to a Postgres instance")
    }
}
