//! Axum route handlers for the coaching API.
//!
//! Every handler follows the same sequence: authenticate, check ownership,
//! validate, then rate-limit and generate under the endpoint's deadline.

use std::future::Future;

use axum::{extract::State, Json};
use chrono::Utc;
use tracing::{info, warn};

use crate::auth::AuthUser;
use crate::coaching::models::{
    parse_client_date, GenerateSuggestionsRequest, GenerateSuggestionsResponse,
    MonthlyReportRequest, OptimizeGoalRequest, OptimizeGoalResponse, ReportResponse,
    SuggestSubGoalsRequest, SuggestSubGoalsResponse, WeeklyReportRequest, YearlyReportRequest,
};
use crate::coaching::optimize::{
    optimize_goal, suggest_sub_goals, OptimizeGoalInput, SuggestSubGoalsInput,
};
use crate::coaching::reports::{
    generate_monthly_report, generate_suggestions, generate_weekly_report, generate_yearly_report,
};
use crate::coaching::validation::{
    require_owner, require_string, require_year, sanitize_array_size, sanitize_string,
    MAX_CATEGORY_CHARS, MAX_DESCRIPTION_CHARS, MAX_GOAL_TITLE_CHARS, MAX_MOTIVATION_CHARS,
};
use crate::errors::AppError;
use crate::llm_client::LlmError;
use crate::rate_limit::{enforce_rate_limit, Endpoint};
use crate::state::AppState;

const MAX_GOALS: usize = 200;
const MAX_CHECK_INS: usize = 2000;
const MAX_GOALS_LONG_PERIOD: usize = 300;
const MAX_CHECK_INS_LONG_PERIOD: usize = 5000;

fn failure_prefix(endpoint: Endpoint) -> &'static str {
    match endpoint {
        Endpoint::OptimizeGoal => "Failed to optimize goal",
        Endpoint::GenerateSuggestions => "Failed to generate suggestions",
        Endpoint::SuggestSubGoals => "Failed to suggest sub-goals",
        Endpoint::GenerateWeeklyReport => "Failed to generate weekly report",
        Endpoint::GenerateMonthlyReport => "Failed to generate monthly report",
        Endpoint::GenerateYearlyReport => "Failed to generate yearly report",
    }
}

/// Charges the principal's quota for `endpoint`, then runs `work`. Both steps
/// share the endpoint's deadline; on expiry nothing partial is returned.
async fn run_metered<T, F>(
    state: &AppState,
    user_id: &str,
    endpoint: Endpoint,
    work: F,
) -> Result<T, AppError>
where
    F: Future<Output = Result<T, LlmError>>,
{
    let deadline = endpoint.deadline();
    let metered = async {
        enforce_rate_limit(state.rate_limiter.as_ref(), user_id, endpoint).await?;
        work.await
            .map_err(|e| AppError::Llm(format!("{}: {e}", failure_prefix(endpoint))))
    };

    match tokio::time::timeout(deadline, metered).await {
        Ok(result) => result,
        Err(_) => {
            warn!("{endpoint} for {user_id} exceeded its {}s deadline", deadline.as_secs());
            Err(AppError::DeadlineExceeded(deadline.as_secs()))
        }
    }
}

/// POST /api/v1/goals/optimize
pub async fn handle_optimize_goal(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<OptimizeGoalRequest>,
) -> Result<Json<OptimizeGoalResponse>, AppError> {
    let input = OptimizeGoalInput {
        goal_title: require_string(req.goal_title.as_deref(), "goalTitle", MAX_GOAL_TITLE_CHARS)?,
        category: require_string(req.category.as_deref(), "category", MAX_CATEGORY_CHARS)?,
        motivation: sanitize_string(
            req.motivation.as_deref(),
            "motivation",
            MAX_MOTIVATION_CHARS,
            false,
        )?,
        target_date: req.target_date,
        locale: req.locale,
    };

    let result = run_metered(
        &state,
        &auth.user_id,
        Endpoint::OptimizeGoal,
        optimize_goal(state.llm.as_ref(), &input, Utc::now()),
    )
    .await?;

    info!(
        "Goal optimized successfully: user_id={} original_title={:?}",
        auth.user_id, input.goal_title
    );
    Ok(Json(result))
}

/// POST /api/v1/goals/sub-goals
pub async fn handle_suggest_sub_goals(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<SuggestSubGoalsRequest>,
) -> Result<Json<SuggestSubGoalsResponse>, AppError> {
    let input = SuggestSubGoalsInput {
        goal_title: require_string(req.goal_title.as_deref(), "goalTitle", MAX_GOAL_TITLE_CHARS)?,
        category: require_string(req.category.as_deref(), "category", MAX_CATEGORY_CHARS)?,
        description: sanitize_string(
            req.description.as_deref(),
            "description",
            MAX_DESCRIPTION_CHARS,
            false,
        )?,
        locale: req.locale,
    };

    let result = run_metered(
        &state,
        &auth.user_id,
        Endpoint::SuggestSubGoals,
        suggest_sub_goals(state.llm.as_ref(), &input),
    )
    .await?;

    info!(
        "Sub-goal suggestions generated: user_id={} sub_goal_count={}",
        auth.user_id,
        result.sub_goals.len()
    );
    Ok(Json(result))
}

/// POST /api/v1/suggestions
pub async fn handle_generate_suggestions(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<GenerateSuggestionsRequest>,
) -> Result<Json<GenerateSuggestionsResponse>, AppError> {
    require_owner(&auth.user_id, req.user_id.as_deref())?;
    let goals = req
        .goals
        .ok_or_else(|| AppError::Validation("goals array is required".to_string()))?;
    sanitize_array_size(&goals, "goals", MAX_GOALS)?;
    sanitize_array_size(&req.check_ins, "checkIns", MAX_CHECK_INS)?;

    let suggestions = run_metered(
        &state,
        &auth.user_id,
        Endpoint::GenerateSuggestions,
        generate_suggestions(state.llm.as_ref(), &goals, &req.check_ins, req.locale),
    )
    .await?;

    info!(
        "Suggestions generated successfully: user_id={} goals={} check_ins={}",
        auth.user_id,
        goals.len(),
        req.check_ins.len()
    );
    Ok(Json(GenerateSuggestionsResponse { suggestions }))
}

/// POST /api/v1/reports/weekly
pub async fn handle_weekly_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<WeeklyReportRequest>,
) -> Result<Json<ReportResponse>, AppError> {
    require_owner(&auth.user_id, req.user_id.as_deref())?;
    let (Some(week_start), Some(week_end), Some(goals)) = (req.week_start, req.week_end, req.goals)
    else {
        return Err(AppError::Validation(
            "weekStart, weekEnd and goals array are required".to_string(),
        ));
    };
    let week_start = parse_client_date(&week_start)
        .ok_or_else(|| AppError::Validation("weekStart must be a valid date".to_string()))?;
    let week_end = parse_client_date(&week_end)
        .ok_or_else(|| AppError::Validation("weekEnd must be a valid date".to_string()))?;
    sanitize_array_size(&goals, "goals", MAX_GOALS)?;
    sanitize_array_size(&req.check_ins, "checkIns", MAX_CHECK_INS)?;

    let content = run_metered(
        &state,
        &auth.user_id,
        Endpoint::GenerateWeeklyReport,
        generate_weekly_report(
            state.llm.as_ref(),
            week_start,
            week_end,
            &goals,
            &req.check_ins,
            req.locale,
        ),
    )
    .await?;

    info!(
        "Weekly report generated successfully: user_id={} week_start={} goals={} check_ins={}",
        auth.user_id,
        week_start.date_naive(),
        goals.len(),
        req.check_ins.len()
    );
    Ok(Json(ReportResponse { content }))
}

/// POST /api/v1/reports/monthly
pub async fn handle_monthly_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<MonthlyReportRequest>,
) -> Result<Json<ReportResponse>, AppError> {
    require_owner(&auth.user_id, req.user_id.as_deref())?;
    let (Some(year), Some(month), Some(goals)) = (req.year, req.month, req.goals) else {
        return Err(AppError::Validation(
            "year, month and goals array are required".to_string(),
        ));
    };
    let year = require_year(year)?;
    if !(1..=12).contains(&month) {
        return Err(AppError::Validation("month must be between 1 and 12".to_string()));
    }
    sanitize_array_size(&goals, "goals", MAX_GOALS_LONG_PERIOD)?;
    sanitize_array_size(&req.check_ins, "checkIns", MAX_CHECK_INS_LONG_PERIOD)?;

    let content = run_metered(
        &state,
        &auth.user_id,
        Endpoint::GenerateMonthlyReport,
        generate_monthly_report(
            state.llm.as_ref(),
            year,
            month,
            &goals,
            &req.check_ins,
            req.locale,
        ),
    )
    .await?;

    info!(
        "Monthly report generated successfully: user_id={} period={year}-{month:02} goals={} check_ins={}",
        auth.user_id,
        goals.len(),
        req.check_ins.len()
    );
    Ok(Json(ReportResponse { content }))
}

/// POST /api/v1/reports/yearly
pub async fn handle_yearly_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<YearlyReportRequest>,
) -> Result<Json<ReportResponse>, AppError> {
    require_owner(&auth.user_id, req.user_id.as_deref())?;
    let (Some(year), Some(goals)) = (req.year, req.goals) else {
        return Err(AppError::Validation(
            "year and goals array are required".to_string(),
        ));
    };
    let year = require_year(year)?;
    sanitize_array_size(&goals, "goals", MAX_GOALS_LONG_PERIOD)?;
    sanitize_array_size(&req.check_ins, "checkIns", MAX_CHECK_INS_LONG_PERIOD)?;

    let content = run_metered(
        &state,
        &auth.user_id,
        Endpoint::GenerateYearlyReport,
        generate_yearly_report(state.llm.as_ref(), year, &goals, &req.check_ins, req.locale),
    )
    .await?;

    info!(
        "Yearly report generated successfully: user_id={} year={year} goals={} check_ins={}",
        auth.user_id,
        goals.len(),
        req.check_ins.len()
    );
    Ok(Json(ReportResponse { content }))
}
