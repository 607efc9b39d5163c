pub mod health;

#[cfg(test)]
pub mod test_helpers;

use axum::{
    routing::{get, post},
    Router,
};

use crate::coaching::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Goals
        .route("/api/v1/goals/optimize", post(handlers::handle_optimize_goal))
        .route(
            "/api/v1/goals/sub-goals",
            post(handlers::handle_suggest_sub_goals),
        )
        // Suggestions & reports
        .route(
            "/api/v1/suggestions",
            post(handlers::handle_generate_suggestions),
        )
        .route("/api/v1/reports/weekly", post(handlers::handle_weekly_report))
        .route(
            "/api/v1/reports/monthly",
            post(handlers::handle_monthly_report),
        )
        .route("/api/v1/reports/yearly", post(handlers::handle_yearly_report))
        .with_state(state)
}
