use std::sync::Arc;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use super::{
    advance_counter, Clock, Endpoint, EndpointCounter, RateLimitError, RateLimiterStore,
    RateLimits, WindowMode,
};

const KEY_PREFIX: &str = "ai_rate_limits:";
const MAX_CAS_ATTEMPTS: u32 = 8;

/// Replaces the endpoint field only if it still holds the value the caller read.
/// ARGV[2] is the empty string when the caller saw no field.
const COMPARE_AND_SET_SCRIPT: &str = r#"
local current = redis.call('HGET', KEYS[1], ARGV[1])
if (current == false and ARGV[2] == '') or current == ARGV[2] then
  redis.call('HSET', KEYS[1], ARGV[1], ARGV[3])
  redis.call('HSET', KEYS[1], 'updatedAt', ARGV[4])
  return 1
end
return 0
"#;

/// Redis-backed store: one hash per principal (`ai_rate_limits:<principal>`),
/// one JSON-encoded `EndpointCounter` per endpoint field.
///
/// Admission is an optimistic read → compute → compare-and-set loop. The limit
/// check runs before the write, so a rejected call never touches the hash.
pub struct RedisRateLimiterStore {
    client: redis::Client,
    script: redis::Script,
    clock: Arc<dyn Clock>,
    mode: WindowMode,
}

impl RedisRateLimiterStore {
    pub fn new(client: redis::Client, clock: Arc<dyn Clock>, mode: WindowMode) -> Self {
        Self {
            client,
            script: redis::Script::new(COMPARE_AND_SET_SCRIPT),
            clock,
            mode,
        }
    }
}

fn record_key(principal: &str) -> String {
    format!("{KEY_PREFIX}{principal}")
}

#[async_trait]
impl RateLimiterStore for RedisRateLimiterStore {
    async fn check_and_increment(
        &self,
        principal: &str,
        endpoint: Endpoint,
        limits: RateLimits,
    ) -> Result<(), RateLimitError> {
        let mut con = self
            .client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")?;
        let key = record_key(principal);

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let raw: Option<String> = con
                .hget(&key, endpoint.as_str())
                .await
                .context("Failed to read rate limit record")?;
            let current = raw
                .as_deref()
                .and_then(|s| serde_json::from_str::<EndpointCounter>(s).ok());

            let now = self.clock.now();
            let next = advance_counter(current.as_ref(), now, limits, self.mode, endpoint)?;
            let encoded = serde_json::to_string(&next).context("Failed to encode counter")?;

            let swapped: i32 = self
                .script
                .key(&key)
                .arg(endpoint.as_str())
                .arg(raw.as_deref().unwrap_or(""))
                .arg(&encoded)
                .arg(now.to_rfc3339())
                .invoke_async(&mut con)
                .await
                .context("Failed to write rate limit record")?;

            if swapped == 1 {
                return Ok(());
            }
            debug!("Rate limit CAS conflict for {principal}/{endpoint} (attempt {attempt})");
        }

        Err(RateLimitError::Store(anyhow!(
            "rate limit record for {principal} stayed contended after {MAX_CAS_ATTEMPTS} attempts"
        )))
    }
}
