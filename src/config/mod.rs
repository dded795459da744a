//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if required vars are missing.
//! The dashboard URL is wrapped in secrecy::SecretString since it may
//! carry credentials in its userinfo or query string.

use std::time::Duration;

use crate::error::{Error, Result};
use secrecy::SecretString;

/// Quiet period used when `DEBOUNCE_GAP_MS` is not set.
pub const DEFAULT_GAP: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct Config {
    pub dashboard_url: SecretString,
    pub engine: EngineConfig,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let dashboard_url = lookup("DASHBOARD_URL")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                Error::Config("required environment variable DASHBOARD_URL is not set".to_string())
            })?;

        let gap = match lookup("DEBOUNCE_GAP_MS") {
            Some(raw) => parse_gap_ms(&raw)?,
            None => DEFAULT_GAP,
        };

        let engine = EngineConfig { gap };
        engine.validate()?;

        Ok(Self {
            dashboard_url: SecretString::from(dashboard_url),
            engine,
            otel_endpoint: lookup("OTEL_ENDPOINT").filter(|v| !v.is_empty()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}

/// Engine tunables. The gap is the only one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Quiet period that must pass with no new submission before a key flushes.
    pub gap: Duration,
}

impl EngineConfig {
    pub fn new(gap: Duration) -> Self {
        Self { gap }
    }

    /// Reject a zero gap, which would turn debouncing into per-item delivery.
    pub fn validate(&self) -> Result<()> {
        if self.gap.is_zero() {
            return Err(Error::Config("debounce gap must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { gap: DEFAULT_GAP }
    }
}

fn parse_gap_ms(raw: &str) -> Result<Duration> {
    let ms: u64 = raw
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("DEBOUNCE_GAP_MS={raw:?} is not a valid integer: {e}")))?;
    Ok(Duration::from_millis(ms))
}
