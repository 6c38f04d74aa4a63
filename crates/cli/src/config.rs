// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Paths that never carry credentials and never trigger renewal.
pub const DEFAULT_PUBLIC_PATHS: &[&str] = &[
    "/auth/login",
    "/auth/register",
    "/auth/refresh",
    "/auth/reset-password",
    "/system/health",
];

/// Settings for one [`crate::pipeline::Pipeline`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// API base URL relative request paths are joined onto.
    pub base_url: String,
    /// Transport timeout per round trip, refresh included.
    pub timeout_ms: u64,
    /// URL fragments that mark a request as public.
    pub public_paths: Vec<String>,
    /// Refresh endpoint path.
    pub refresh_path: String,
    /// Login endpoint path (used by `tokenpipe login`).
    pub login_path: String,
    /// Health endpoint path (used by the connectivity probe).
    pub health_path: String,
    /// Route navigated to when the session cannot continue.
    pub login_route: String,
    /// Route navigated to when the server reports maintenance.
    pub maintenance_route: String,
    /// Boolean body field a 503 sets during maintenance.
    pub maintenance_flag: String,
    /// Text a 403 message contains during maintenance.
    pub maintenance_keyword: String,
    /// Seconds before `exp` at which a token already counts as expired.
    pub expiry_margin_secs: u64,
    /// Sent as `X-Client-Version`.
    pub client_version: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/api".to_owned(),
            timeout_ms: 30_000,
            public_paths: DEFAULT_PUBLIC_PATHS.iter().map(|p| (*p).to_owned()).collect(),
            refresh_path: "/auth/refresh".to_owned(),
            login_path: "/auth/login".to_owned(),
            health_path: "/system/health".to_owned(),
            login_route: "/auth/login".to_owned(),
            maintenance_route: "/mantenimiento".to_owned(),
            maintenance_flag: "enMantenimiento".to_owned(),
            maintenance_keyword: "mantenimiento".to_owned(),
            expiry_margin_secs: 0,
            client_version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

impl PipelineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn expiry_margin(&self) -> Duration {
        Duration::from_secs(self.expiry_margin_secs)
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_url.trim().is_empty() {
            anyhow::bail!("base_url must not be empty");
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            anyhow::bail!("base_url must start with http:// or https://");
        }
        if self.timeout_ms == 0 {
            anyhow::bail!("timeout_ms must be greater than zero");
        }
        if self.refresh_path.is_empty() {
            anyhow::bail!("refresh_path must not be empty");
        }
        Ok(())
    }
}

/// Authenticated API client with transparent token renewal.
#[derive(Debug, Parser)]
#[command(name = "tokenpipe", version, about)]
pub struct Config {
    /// API base URL.
    #[arg(long, env = "TOKENPIPE_BASE_URL")]
    pub base_url: Option<String>,

    /// Path to a JSON pipeline config file.
    #[arg(long, env = "TOKENPIPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Credential store file.
    #[arg(long, env = "TOKENPIPE_STORE")]
    pub store: Option<PathBuf>,

    /// Request timeout in milliseconds.
    #[arg(long, env = "TOKENPIPE_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Treat tokens as expired this many seconds early.
    #[arg(long, env = "TOKENPIPE_EXPIRY_MARGIN_SECS")]
    pub expiry_margin_secs: Option<u64>,

    /// Log format (json or text).
    #[arg(long, env = "TOKENPIPE_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "TOKENPIPE_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: crate::command::Command,
}

impl Config {
    /// Build the pipeline config: file (if any), then flag overrides.
    pub fn pipeline(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match self.config {
            Some(ref path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(ref url) = self.base_url {
            config.base_url = url.clone();
        }
        if let Some(ms) = self.timeout_ms {
            config.timeout_ms = ms;
        }
        if let Some(secs) = self.expiry_margin_secs {
            config.expiry_margin_secs = secs;
        }
        config.validate()?;
        Ok(config)
    }

    /// Credential store path: `--store`, then `$XDG_STATE_HOME/tokenpipe`,
    /// then `$HOME/.local/state/tokenpipe`.
    pub fn store_path(&self) -> PathBuf {
        if let Some(ref path) = self.store {
            return path.clone();
        }
        if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
            return PathBuf::from(xdg).join("tokenpipe/credentials.json");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".local/state/tokenpipe/credentials.json");
        }
        PathBuf::from(".tokenpipe/credentials.json")
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
