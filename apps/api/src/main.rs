mod auth;
mod cleanup;
mod coaching;
mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod rate_limit;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cleanup::{spawn_cleanup_task, PgChildRecordRepository};
use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::llm_client::GeminiClient;
use crate::rate_limit::build_rate_limiter;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Momentum API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL and apply the schema
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;

    // Initialize rate limiter (Postgres by default, swap via RATE_LIMIT_BACKEND)
    let rate_limiter = build_rate_limiter(&config, &db)?;

    // Initialize LLM client
    let llm = Arc::new(GeminiClient::new(config.gemini_api_key.clone())?);
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Orphan cleanup runs in-process on a fixed interval
    if config.cleanup_enabled {
        let repo = Arc::new(PgChildRecordRepository::new(db.clone()));
        spawn_cleanup_task(
            repo,
            Duration::from_secs(config.cleanup_interval_secs),
            config.cleanup_batch_size,
        );
        info!(
            "Orphan cleanup scheduled every {}s (batch size {})",
            config.cleanup_interval_secs, config.cleanup_batch_size
        );
    } else {
        info!("Orphan cleanup disabled");
    }

    // Build app state
    let state = AppState {
        llm,
        rate_limiter,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
