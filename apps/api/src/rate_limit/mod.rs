//! Per-principal, per-endpoint rate limiting.
//!
//! Every rate-limited endpoint keeps an `EndpointCounter` inside the principal's
//! record. A call is admitted by `RateLimiterStore::check_and_increment`, which
//! performs a transactional read-modify-write of that record: counts are reused
//! while their window is live, reset once it has elapsed, incremented for the
//! current call, and persisted only when both ceilings hold.
//!
//! Backends differ only in the transactional primitive they use:
//! - `postgres`: row lock (`SELECT ... FOR UPDATE`) on a JSONB record
//! - `redis`: compare-and-swap of the endpoint field via a Lua script
//! - `memory`: a process-local map behind a mutex

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;

pub mod memory;
pub mod postgres;
pub mod redis_store;

pub use memory::InMemoryRateLimiterStore;
pub use postgres::PgRateLimiterStore;
pub use redis_store::RedisRateLimiterStore;

pub const MINUTE_WINDOW_MS: i64 = 60 * 1000;
pub const DAY_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

// ────────────────────────────────────────────────────────────────────────────
// Endpoints and ceilings
// ────────────────────────────────────────────────────────────────────────────

/// The fixed set of rate-limited operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Endpoint {
    OptimizeGoal,
    GenerateSuggestions,
    SuggestSubGoals,
    GenerateWeeklyReport,
    GenerateMonthlyReport,
    GenerateYearlyReport,
}

impl Endpoint {
    #[cfg(test)]
    pub const ALL: [Endpoint; 6] = [
        Endpoint::OptimizeGoal,
        Endpoint::GenerateSuggestions,
        Endpoint::SuggestSubGoals,
        Endpoint::GenerateWeeklyReport,
        Endpoint::GenerateMonthlyReport,
        Endpoint::GenerateYearlyReport,
    ];

    /// Key under which the endpoint's counter is stored in the principal's record.
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::OptimizeGoal => "optimizeGoal",
            Endpoint::GenerateSuggestions => "generateSuggestions",
            Endpoint::SuggestSubGoals => "suggestSubGoals",
            Endpoint::GenerateWeeklyReport => "generateWeeklyReport",
            Endpoint::GenerateMonthlyReport => "generateMonthlyReport",
            Endpoint::GenerateYearlyReport => "generateYearlyReport",
        }
    }

    pub fn limits(&self) -> RateLimits {
        let (max_per_minute, max_per_day) = match self {
            Endpoint::OptimizeGoal => (10, 100),
            Endpoint::GenerateSuggestions => (5, 50),
            Endpoint::SuggestSubGoals => (15, 150),
            Endpoint::GenerateWeeklyReport => (5, 50),
            Endpoint::GenerateMonthlyReport => (3, 30),
            Endpoint::GenerateYearlyReport => (3, 20),
        };
        RateLimits {
            max_per_minute,
            max_per_day,
        }
    }

    /// Wall-clock budget for one call, after which the request is abandoned.
    pub fn deadline(&self) -> Duration {
        let secs = match self {
            Endpoint::SuggestSubGoals => 45,
            Endpoint::OptimizeGoal | Endpoint::GenerateSuggestions => 60,
            Endpoint::GenerateWeeklyReport => 90,
            Endpoint::GenerateMonthlyReport | Endpoint::GenerateYearlyReport => 120,
        };
        Duration::from_secs(secs)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub max_per_minute: u32,
    pub max_per_day: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitWindow {
    Minute,
    Day,
}

impl fmt::Display for LimitWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitWindow::Minute => f.write_str("minute"),
            LimitWindow::Day => f.write_str("day"),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Counter state
// ────────────────────────────────────────────────────────────────────────────

/// Persisted per-endpoint counter. Serialized field names are shared by every backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointCounter {
    pub minute_count: u32,
    pub day_count: u32,
    pub last_minute_at: DateTime<Utc>,
    pub last_day_at: DateTime<Utc>,
}

/// How window timestamps move when a call is admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowMode {
    /// Both timestamps are set to "now" on every admitted call, so a window
    /// stays open for as long as calls keep arriving less than one window apart.
    #[default]
    Extending,
    /// A timestamp only moves when its window has elapsed, giving fixed windows
    /// anchored at the first call of each window.
    Anchored,
}

impl FromStr for WindowMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "extending" => Ok(WindowMode::Extending),
            "anchored" => Ok(WindowMode::Anchored),
            other => bail!("unknown rate limit window mode '{other}' (expected extending|anchored)"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("rate limit exceeded for {endpoint} ({window} window)")]
    Exceeded {
        endpoint: Endpoint,
        window: LimitWindow,
    },

    #[error("principal id must not be empty")]
    InvalidPrincipal,

    #[error("rate limit store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

/// Computes the counter to persist for the current call, or rejects it.
///
/// Absent counters behave as zero counts with timestamps at `now`.
/// Elapsed time below zero (clock skew between writers) keeps the window live.
pub fn advance_counter(
    current: Option<&EndpointCounter>,
    now: DateTime<Utc>,
    limits: RateLimits,
    mode: WindowMode,
    endpoint: Endpoint,
) -> Result<EndpointCounter, RateLimitError> {
    let (stored_minute, stored_day, last_minute_at, last_day_at) = match current {
        Some(c) => (c.minute_count, c.day_count, c.last_minute_at, c.last_day_at),
        None => (0, 0, now, now),
    };

    let minute_live = (now - last_minute_at).num_milliseconds() < MINUTE_WINDOW_MS;
    let day_live = (now - last_day_at).num_milliseconds() < DAY_WINDOW_MS;

    let minute_count = (if minute_live { stored_minute } else { 0 }).saturating_add(1);
    let day_count = (if day_live { stored_day } else { 0 }).saturating_add(1);

    if minute_count > limits.max_per_minute {
        return Err(RateLimitError::Exceeded {
            endpoint,
            window: LimitWindow::Minute,
        });
    }
    if day_count > limits.max_per_day {
        return Err(RateLimitError::Exceeded {
            endpoint,
            window: LimitWindow::Day,
        });
    }

    let (last_minute_at, last_day_at) = match mode {
        WindowMode::Extending => (now, now),
        WindowMode::Anchored => (
            if minute_live { last_minute_at } else { now },
            if day_live { last_day_at } else { now },
        ),
    };

    Ok(EndpointCounter {
        minute_count,
        day_count,
        last_minute_at,
        last_day_at,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Store trait
// ────────────────────────────────────────────────────────────────────────────

/// Source of "now" for window arithmetic.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Transactional counter store. Carried in `AppState` as `Arc<dyn RateLimiterStore>`.
///
/// Implementations must make the read, the limit check and the write one atomic
/// step per principal, and must persist nothing when the call is rejected.
#[async_trait]
pub trait RateLimiterStore: Send + Sync {
    async fn check_and_increment(
        &self,
        principal: &str,
        endpoint: Endpoint,
        limits: RateLimits,
    ) -> Result<(), RateLimitError>;
}

/// Admits one call of `endpoint` by `principal` under the endpoint's ceilings.
pub async fn enforce_rate_limit(
    store: &dyn RateLimiterStore,
    principal: &str,
    endpoint: Endpoint,
) -> Result<(), RateLimitError> {
    if principal.trim().is_empty() {
        return Err(RateLimitError::InvalidPrincipal);
    }

    let result = store
        .check_and_increment(principal, endpoint, endpoint.limits())
        .await;

    if let Err(RateLimitError::Exceeded { window, .. }) = &result {
        warn!("Rate limit hit: principal={principal} endpoint={endpoint} window={window}");
    }
    result
}

// ────────────────────────────────────────────────────────────────────────────
// Backend selection
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateLimitBackend {
    #[default]
    Postgres,
    Redis,
    Memory,
}

impl FromStr for RateLimitBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(RateLimitBackend::Postgres),
            "redis" => Ok(RateLimitBackend::Redis),
            "memory" => Ok(RateLimitBackend::Memory),
            other => bail!("unknown rate limit backend '{other}' (expected postgres|redis|memory)"),
        }
    }
}

/// Builds the configured store.
pub fn build_rate_limiter(
    config: &Config,
    pool: &PgPool,
) -> anyhow::Result<Arc<dyn RateLimiterStore>> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mode = config.rate_limit_window_mode;

    let store: Arc<dyn RateLimiterStore> = match config.rate_limit_backend {
        RateLimitBackend::Postgres => {
            Arc::new(PgRateLimiterStore::new(pool.clone(), clock, mode))
        }
        RateLimitBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .context("REDIS_URL must be set when RATE_LIMIT_BACKEND=redis")?;
            let client = redis::Client::open(url).context("Invalid REDIS_URL")?;
            Arc::new(RedisRateLimiterStore::new(client, clock, mode))
        }
        RateLimitBackend::Memory => {
            warn!("In-memory rate limiter selected: limits are not shared across instances");
            Arc::new(InMemoryRateLimiterStore::new(clock, mode))
        }
    };

    info!(
        "Rate limiter initialized (backend: {:?}, window mode: {:?})",
        config.rate_limit_backend, mode
    );
    Ok(store)
}

#[cfg(test)]
pub(crate) struct ManualClock(std::sync::Mutex<DateTime<Utc>>);

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new(start: DateTime<Utc>) -> Self {
        Self(std::sync::Mutex::new(start))
    }

    pub(crate) fn advance(&self, by: chrono::Duration) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}
