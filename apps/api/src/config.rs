use anyhow::{Context, Result};

use crate::rate_limit::{RateLimitBackend, WindowMode};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub gemini_api_key: String,
    /// Only required when `rate_limit_backend` is `redis`.
    pub redis_url: Option<String>,
    pub rate_limit_backend: RateLimitBackend,
    pub rate_limit_window_mode: WindowMode,
    pub cleanup_enabled: bool,
    pub cleanup_interval_secs: u64,
    pub cleanup_batch_size: usize,
    pub gateway_secret: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            database_url: require_env("DATABASE_URL")?,
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            redis_url: optional_env("REDIS_URL"),
            rate_limit_backend: parse_env("RATE_LIMIT_BACKEND", RateLimitBackend::default())?,
            rate_limit_window_mode: parse_env("RATE_LIMIT_WINDOW_MODE", WindowMode::default())?,
            cleanup_enabled: parse_env("CLEANUP_ENABLED", true)?,
            cleanup_interval_secs: parse_env("CLEANUP_INTERVAL_SECS", 86_400)?,
            cleanup_batch_size: parse_env("CLEANUP_BATCH_SIZE", crate::cleanup::DEFAULT_BATCH_SIZE)?,
            gateway_secret: optional_env("GATEWAY_SECRET"),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.rate_limit_backend == RateLimitBackend::Redis && self.redis_url.is_none() {
            anyhow::bail!("REDIS_URL must be set when RATE_LIMIT_BACKEND=redis");
        }
        if self.cleanup_interval_secs == 0 {
            anyhow::bail!("CLEANUP_INTERVAL_SECS must be greater than zero");
        }
        if self.cleanup_batch_size == 0 {
            anyhow::bail!("CLEANUP_BATCH_SIZE must be greater than zero");
        }
        Ok(())
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key} has an invalid value '{raw}': {e}")),
        None => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Configuration for router tests: in-memory limiter, no cleanup, no gateway secret.
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost/momentum_test".to_string(),
            gemini_api_key: "test-key".to_string(),
            redis_url: None,
            rate_limit_backend: RateLimitBackend::Memory,
            rate_limit_window_mode: WindowMode::Extending,
            cleanup_enabled: false,
            cleanup_interval_secs: 86_400,
            cleanup_batch_size: crate::cleanup::DEFAULT_BATCH_SIZE,
            gateway_secret: None,
            port: 8080,
            rust_log: "info".to_string(),
        }
    }
}
