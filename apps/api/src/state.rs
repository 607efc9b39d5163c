use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::TextGenerator;
use crate::rate_limit::RateLimiterStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Text generation backend. `GeminiClient` in production.
    pub llm: Arc<dyn TextGenerator>,
    /// Per-principal AI rate limiter. Backend chosen via RATE_LIMIT_BACKEND.
    pub rate_limiter: Arc<dyn RateLimiterStore>,
    pub config: Config,
}
