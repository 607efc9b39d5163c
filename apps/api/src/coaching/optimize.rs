//! Goal optimization and sub-goal suggestions: the two JSON-producing services.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::locale::{DurationUnit, Locale};
use super::models::{
    parse_client_date, OptimizeGoalResponse, SubGoal, SuggestSubGoalsResponse, SuggestedSubGoal,
};
use super::prompts::{build_optimize_goal_prompt, build_sub_goals_prompt};
use crate::llm_client::{generate_json, LlmError, TextGenerator};

const OPTIMIZE_MAX_TOKENS: u32 = 2000;
const SUB_GOALS_MAX_TOKENS: u32 = 1200;
/// Up to roughly six weeks the plan is phrased in weeks, beyond that in months.
const WEEKS_PHRASE_MAX_DAYS: i64 = 45;

const NO_DEADLINE_CONSTRAINT: &str = "No explicit deadline was provided. Choose a realistic timeframe (for example 8–12 weeks) and keep it consistent across the SMART goal and all sub-goals.";

/// Sanitized input for `optimize_goal`.
#[derive(Debug, Clone)]
pub struct OptimizeGoalInput {
    pub goal_title: String,
    pub category: String,
    pub motivation: Option<String>,
    pub target_date: Option<String>,
    pub locale: Locale,
}

#[derive(Debug, Clone)]
pub struct SuggestSubGoalsInput {
    pub goal_title: String,
    pub category: String,
    pub description: Option<String>,
    pub locale: Locale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanDuration {
    pub phrase: String,
    pub weeks: i64,
}

/// Whole days to `target` (at least 1), phrased in weeks up to 45 days and in months beyond.
pub fn duration_phrase(target: DateTime<Utc>, now: DateTime<Utc>, locale: Locale) -> PlanDuration {
    let diff_ms = (target - now).num_milliseconds() as f64;
    let days = ((diff_ms / 86_400_000.0).round() as i64).max(1);
    let weeks = ((days as f64 / 7.0).round() as i64).max(1);

    let phrase = if days <= WEEKS_PHRASE_MAX_DAYS {
        locale.duration_phrase(weeks, DurationUnit::Weeks)
    } else {
        let months = ((days as f64 / 30.0).round() as i64).max(1);
        locale.duration_phrase(months, DurationUnit::Months)
    };
    PlanDuration { phrase, weeks }
}

// ────────────────────────────────────────────────────────────────────────────
// Raw model output
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOptimizedGoal {
    optimized_title: Option<String>,
    sub_goals: Option<Vec<RawSubGoal>>,
    explanation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSubGoal {
    id: Option<String>,
    title: Option<String>,
    is_completed: Option<bool>,
    due_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSubGoalSuggestions {
    sub_goals: Option<Vec<Value>>,
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

fn shape_optimized(raw: RawOptimizedGoal) -> Result<OptimizeGoalResponse, LlmError> {
    let (Some(optimized_title), Some(sub_goals), Some(explanation)) = (
        non_blank(raw.optimized_title),
        raw.sub_goals,
        non_blank(raw.explanation),
    ) else {
        return Err(LlmError::InvalidResponse(
            "optimizedTitle, subGoals and explanation are required".to_string(),
        ));
    };

    let sub_goals = sub_goals
        .into_iter()
        .enumerate()
        .map(|(i, sg)| SubGoal {
            id: non_blank(sg.id).unwrap_or_else(|| format!("subgoal-{}", i + 1)),
            title: sg.title.unwrap_or_default(),
            is_completed: sg.is_completed.unwrap_or(false),
            due_date: non_blank(sg.due_date),
        })
        .collect();

    Ok(OptimizeGoalResponse {
        optimized_title,
        sub_goals,
        explanation,
    })
}

fn shape_suggestions(raw: RawSubGoalSuggestions) -> Result<SuggestSubGoalsResponse, LlmError> {
    let items = raw
        .sub_goals
        .ok_or_else(|| LlmError::InvalidResponse("missing subGoals".to_string()))?;

    let sub_goals = items
        .iter()
        .filter_map(|item| {
            let title = match item.get("title") {
                Some(Value::String(s)) => s.trim().to_string(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            (!title.is_empty()).then_some(SuggestedSubGoal { title })
        })
        .collect();

    Ok(SuggestSubGoalsResponse { sub_goals })
}

// ────────────────────────────────────────────────────────────────────────────
// Services
// ────────────────────────────────────────────────────────────────────────────

/// Turns a free-form goal into a SMART goal with 3–5 sub-goals.
pub async fn optimize_goal(
    llm: &dyn TextGenerator,
    input: &OptimizeGoalInput,
    now: DateTime<Utc>,
) -> Result<OptimizeGoalResponse, LlmError> {
    let locale = input.locale;
    let mut time_constraint = NO_DEADLINE_CONSTRAINT.to_string();
    let mut phrase = locale.default_duration_phrase().to_string();

    if let Some(raw) = input.target_date.as_deref() {
        match parse_client_date(raw) {
            Some(target) => {
                let plan = duration_phrase(target, now, locale);
                time_constraint = format!(
                    "The user wants to complete this goal by {}, which is about {} weeks from now. The TOTAL duration of the plan MUST correspond to this timeframe. All sub-goals must also be scheduled within this same total timeframe.",
                    target.format("%Y-%m-%d"),
                    plan.weeks
                );
                phrase = plan.phrase;
            }
            None => warn!("Ignoring unparseable targetDate {raw:?}"),
        }
    }

    let prompt = build_optimize_goal_prompt(
        &input.goal_title,
        &input.category,
        input.motivation.as_deref().filter(|m| !m.is_empty()),
        &time_constraint,
        &phrase,
        locale,
    );
    let raw: RawOptimizedGoal = generate_json(llm, &prompt, OPTIMIZE_MAX_TOKENS).await?;
    shape_optimized(raw)
}

/// Suggests 3–6 single-step sub-goals. Blank titles are dropped.
pub async fn suggest_sub_goals(
    llm: &dyn TextGenerator,
    input: &SuggestSubGoalsInput,
) -> Result<SuggestSubGoalsResponse, LlmError> {
    let prompt = build_sub_goals_prompt(
        &input.goal_title,
        &input.category,
        input.description.as_deref().filter(|d| !d.is_empty()),
        input.locale,
    );
    let raw: RawSubGoalSuggestions = generate_json(llm, &prompt, SUB_GOALS_MAX_TOKENS).await?;
    shape_suggestions(raw)
}
