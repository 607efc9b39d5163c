//! Shared test utilities for router-level handler tests.
//!
//! [`TestHarness`] wires the real router to a stub text generator and the
//! in-memory rate limiter driven by a manual clock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt; // for oneshot()

use super::build_router;
use crate::config::Config;
use crate::llm_client::{LlmError, TextGenerator};
use crate::rate_limit::{InMemoryRateLimiterStore, ManualClock, WindowMode};
use crate::state::AppState;

pub const TEST_USER: &str = "u1";

/// What the stub generator does when called.
#[derive(Clone)]
pub enum StubBehavior {
    Reply(String),
    Fail,
    /// Never answers within any endpoint deadline.
    Hang,
}

pub struct StubGenerator {
    behavior: StubBehavior,
    calls: AtomicUsize,
}

impl StubGenerator {
    pub fn new(behavior: StubBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, _prompt: &str, _max: u32) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            StubBehavior::Reply(text) => Ok(text.clone()),
            StubBehavior::Fail => Err(LlmError::Api {
                status: 503,
                message: "model overloaded".to_string(),
            }),
            StubBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(600)).await;
                Ok(String::new())
            }
        }
    }
}

pub struct TestHarness {
    pub llm: Arc<StubGenerator>,
    pub limiter: Arc<InMemoryRateLimiterStore>,
    pub clock: Arc<ManualClock>,
    router: Router,
}

impl TestHarness {
    pub fn new(behavior: StubBehavior) -> Self {
        Self::with_config(behavior, Config::for_tests())
    }

    pub fn with_config(behavior: StubBehavior, config: Config) -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        ));
        let limiter = Arc::new(InMemoryRateLimiterStore::new(
            clock.clone(),
            WindowMode::Extending,
        ));
        let llm = Arc::new(StubGenerator::new(behavior));
        let state = AppState {
            llm: llm.clone(),
            rate_limiter: limiter.clone(),
            config,
        };
        Self {
            llm,
            limiter,
            clock,
            router: build_router(state),
        }
    }

    /// Sends `req` through the router and returns the status and JSON body.
    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

// ---------- Request builders ----------

/// POST `body` as JSON, authenticated as `user` when given.
pub fn post_json(uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// The `error.code` field of an error body.
pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}
