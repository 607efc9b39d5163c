use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{
    advance_counter, Clock, Endpoint, EndpointCounter, RateLimitError, RateLimiterStore,
    RateLimits, WindowMode,
};

/// Process-local store for single-instance deployments.
///
/// The whole map sits behind one mutex, so the read, check and write for a
/// principal happen under the same lock acquisition.
pub struct InMemoryRateLimiterStore {
    records: Mutex<HashMap<String, HashMap<Endpoint, EndpointCounter>>>,
    clock: Arc<dyn Clock>,
    mode: WindowMode,
}

impl InMemoryRateLimiterStore {
    pub fn new(clock: Arc<dyn Clock>, mode: WindowMode) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            clock,
            mode,
        }
    }

    #[cfg(test)]
    pub fn counter(&self, principal: &str, endpoint: Endpoint) -> Option<EndpointCounter> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records
            .get(principal)
            .and_then(|r| r.get(&endpoint))
            .cloned()
    }
}

#[async_trait]
impl RateLimiterStore for InMemoryRateLimiterStore {
    async fn check_and_increment(
        &self,
        principal: &str,
        endpoint: Endpoint,
        limits: RateLimits,
    ) -> Result<(), RateLimitError> {
        let now = self.clock.now();
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());

        let current = records
            .get(principal)
            .and_then(|r| r.get(&endpoint))
            .cloned();
        let next = advance_counter(current.as_ref(), now, limits, self.mode, endpoint)?;

        records
            .entry(principal.to_string())
            .or_default()
            .insert(endpoint, next);
        Ok(())
    }
}
