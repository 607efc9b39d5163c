use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use tracing::warn;

use super::{
    advance_counter, Clock, Endpoint, EndpointCounter, RateLimitError, RateLimiterStore,
    RateLimits, WindowMode,
};

/// Postgres-backed store: one `ai_rate_limits` row per principal, with every
/// endpoint counter in a JSONB object keyed by endpoint name.
///
/// The row is locked with `SELECT ... FOR UPDATE` for the duration of the
/// transaction, so concurrent calls from one principal serialize on it.
#[derive(Clone)]
pub struct PgRateLimiterStore {
    pool: PgPool,
    clock: Arc<dyn Clock>,
    mode: WindowMode,
}

impl PgRateLimiterStore {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>, mode: WindowMode) -> Self {
        Self { pool, clock, mode }
    }
}

#[async_trait]
impl RateLimiterStore for PgRateLimiterStore {
    async fn check_and_increment(
        &self,
        principal: &str,
        endpoint: Endpoint,
        limits: RateLimits,
    ) -> Result<(), RateLimitError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to open rate limit transaction")?;

        // Ensure the row exists so there is something to lock on first use.
        sqlx::query(
            "INSERT INTO ai_rate_limits (principal_id) VALUES ($1) ON CONFLICT (principal_id) DO NOTHING",
        )
        .bind(principal)
        .execute(&mut *tx)
        .await
        .context("Failed to create rate limit record")?;

        let endpoints: Value = sqlx::query_scalar(
            "SELECT endpoints FROM ai_rate_limits WHERE principal_id = $1 FOR UPDATE",
        )
        .bind(principal)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to lock rate limit record")?;

        // Read "now" after the lock is held so queued writers see increasing time.
        let now = self.clock.now();
        let current = read_counter(&endpoints, endpoint);

        let next = match advance_counter(current.as_ref(), now, limits, self.mode, endpoint) {
            Ok(next) => next,
            Err(e) => {
                tx.rollback()
                    .await
                    .context("Failed to roll back rate limit transaction")?;
                return Err(e);
            }
        };

        let encoded = serde_json::to_value(&next).context("Failed to encode counter")?;
        sqlx::query(
            r#"
            UPDATE ai_rate_limits
            SET endpoints = endpoints || jsonb_build_object($2::text, $3::jsonb),
                updated_at = $4
            WHERE principal_id = $1
            "#,
        )
        .bind(principal)
        .bind(endpoint.as_str())
        .bind(encoded)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to write rate limit record")?;

        tx.commit()
            .await
            .context("Failed to commit rate limit transaction")?;
        Ok(())
    }
}

/// Extracts one endpoint counter from the stored JSONB object.
/// A malformed entry is treated as absent so a bad write cannot lock a user out.
fn read_counter(endpoints: &Value, endpoint: Endpoint) -> Option<EndpointCounter> {
    let raw = endpoints.get(endpoint.as_str())?;
    match serde_json::from_value::<EndpointCounter>(raw.clone()) {
        Ok(counter) => Some(counter),
        Err(e) => {
            warn!("Ignoring malformed rate limit counter for {endpoint}: {e}");
            None
        }
    }
}
