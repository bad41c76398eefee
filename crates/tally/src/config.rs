// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::command::Command;

/// Default backend location (the tracker API's development address).
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Connection settings shared by the library and the binary.
#[derive(Debug, Clone, clap::Args)]
pub struct ClientConfig {
    /// Backend base URL.
    #[arg(long, default_value = DEFAULT_BASE_URL, env = "TALLY_BASE_URL")]
    pub base_url: String,

    /// Per-request timeout in milliseconds.
    #[arg(long, default_value_t = 10000, env = "TALLY_TIMEOUT_MS")]
    pub timeout_ms: u64,

    /// File holding the persisted token pair. Defaults to `<state dir>/tokens.json`.
    #[arg(long, env = "TALLY_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_BASE_URL.to_owned(), timeout_ms: 10000, token_file: None }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn token_path(&self) -> PathBuf {
        self.token_file.clone().unwrap_or_else(|| state_dir().join("tokens.json"))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            anyhow::bail!("--base-url must start with http:// or https:// (got {})", self.base_url);
        }
        if self.timeout_ms == 0 {
            anyhow::bail!("--timeout-ms must be greater than zero");
        }
        Ok(())
    }
}

/// Command-line client for the personal-finance tracker.
#[derive(Debug, Parser)]
#[command(name = "tally", version, about)]
pub struct Config {
    #[command(flatten)]
    pub client: ClientConfig,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "TALLY_LOG_LEVEL", default_value = "warn", global = true)]
    pub log_level: String,

    /// Log format (text or json).
    #[arg(long, env = "TALLY_LOG_FORMAT", default_value = "text", global = true)]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Command,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.client.validate()?;
        match self.log_format.as_str() {
            "text" | "json" => {}
            other => anyhow::bail!("invalid log format: {other}"),
        }
        self.command.validate()
    }
}

/// Resolve the state directory for client data.
///
/// Checks `TALLY_STATE_DIR`, then `$XDG_STATE_HOME/tally`,
/// then `$HOME/.local/state/tally`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TALLY_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("tally");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/tally");
    }
    PathBuf::from(".tally")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
