use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::locale::Locale;

// ────────────────────────────────────────────────────────────────────────────
// Client-supplied snapshots
// ────────────────────────────────────────────────────────────────────────────

/// A goal as sent by the client for analysis. Never read from storage here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub target_date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub motivation: Option<String>,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_completed: Option<bool>,
}

impl Goal {
    pub fn explicitly_completed(&self) -> bool {
        self.is_completed == Some(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckIn {
    pub id: String,
    #[serde(default)]
    pub goal_id: String,
    #[serde(default)]
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub score: f64,
    #[serde(default)]
    pub progress_delta: f64,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubGoal {
    pub id: String,
    pub title: String,
    pub is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeGoalRequest {
    pub goal_title: Option<String>,
    pub category: Option<String>,
    pub motivation: Option<String>,
    pub target_date: Option<String>,
    #[serde(default)]
    pub locale: Locale,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeGoalResponse {
    pub optimized_title: String,
    pub sub_goals: Vec<SubGoal>,
    pub explanation: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestSubGoalsRequest {
    pub goal_title: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub locale: Locale,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedSubGoal {
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestSubGoalsResponse {
    pub sub_goals: Vec<SuggestedSubGoal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSuggestionsRequest {
    pub user_id: Option<String>,
    pub goals: Option<Vec<Goal>>,
    #[serde(default)]
    pub check_ins: Vec<CheckIn>,
    #[serde(default)]
    pub locale: Locale,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateSuggestionsResponse {
    pub suggestions: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReportRequest {
    pub user_id: Option<String>,
    pub week_start: Option<String>,
    pub week_end: Option<String>,
    pub goals: Option<Vec<Goal>>,
    #[serde(default)]
    pub check_ins: Vec<CheckIn>,
    #[serde(default)]
    pub locale: Locale,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReportRequest {
    pub user_id: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub goals: Option<Vec<Goal>>,
    #[serde(default)]
    pub check_ins: Vec<CheckIn>,
    #[serde(default)]
    pub locale: Locale,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyReportRequest {
    pub user_id: Option<String>,
    pub year: Option<i32>,
    pub goals: Option<Vec<Goal>>,
    #[serde(default)]
    pub check_ins: Vec<CheckIn>,
    #[serde(default)]
    pub locale: Locale,
}

/// Parses a client-supplied date: RFC 3339, or a bare `YYYY-MM-DD` taken as UTC midnight.
pub fn parse_client_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Shared response for the weekly, monthly and yearly reports.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportResponse {
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_client_date_forms() {
        let expected = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
        assert_eq!(parse_client_date("2025-06-02"), Some(expected));
        assert_eq!(parse_client_date("2025-06-02T00:00:00.000Z"), Some(expected));
        assert_eq!(parse_client_date("2025-06-02T03:00:00+03:00"), Some(expected));
        assert_eq!(parse_client_date("next tuesday"), None);
    }

    #[test]
    fn test_goal_accepts_sparse_client_payload() {
        let g: Goal = serde_json::from_str(
            r#"{"id":"g1","title":"Walk","category":"health","progress":30,"isArchived":false}"#,
        )
        .unwrap();
        assert_eq!(g.progress, 30.0);
        assert!(!g.explicitly_completed());
    }

    #[test]
    fn test_sub_goal_omits_missing_due_date() {
        let sg = SubGoal {
            id: "subgoal-1".into(),
            title: "Buy shoes".into(),
            is_completed: false,
            due_date: None,
        };
        let v = serde_json::to_value(&sg).unwrap();
        assert_eq!(v["isCompleted"], false);
        assert!(v.get("dueDate").is_none());
    }
}
