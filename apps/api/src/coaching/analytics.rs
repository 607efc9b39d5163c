//! Period analytics: pure aggregation over client-supplied goals and check-ins.
//!
//! The same summary feeds every report; only the check-in distribution differs
//! by period (weekday for weekly, week-of-month for monthly, month for yearly).

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use super::models::{CheckIn, Goal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distribution {
    /// Key: weekday, Sunday = 0.
    ByWeekday,
    /// Key: week of month, 1-based, weeks starting on Sunday.
    ByWeekOfMonth,
    /// Key: month, 1-based.
    ByMonth,
}

#[derive(Debug, Clone)]
pub struct PeriodAnalytics<'a> {
    pub total_goals: usize,
    pub completed_goals: Vec<&'a Goal>,
    pub active_goals: Vec<&'a Goal>,
    pub average_progress: f64,
    pub goals_by_category: BTreeMap<String, usize>,
    pub total_check_ins: usize,
    pub average_check_in_score: f64,
    pub check_in_distribution: BTreeMap<u32, usize>,
}

impl PeriodAnalytics<'_> {
    pub fn explicitly_completed(&self) -> usize {
        self.completed_goals
            .iter()
            .filter(|g| g.explicitly_completed())
            .count()
    }
}

pub fn is_completed(goal: &Goal) -> bool {
    goal.explicitly_completed() || goal.progress >= 100.0
}

pub fn is_active(goal: &Goal) -> bool {
    !goal.is_archived && !goal.explicitly_completed() && goal.progress < 100.0
}

pub fn calculate<'a>(
    goals: &'a [Goal],
    check_ins: &[CheckIn],
    distribution: Distribution,
) -> PeriodAnalytics<'a> {
    let completed_goals = goals.iter().filter(|g| is_completed(g)).collect();
    let active_goals = goals.iter().filter(|g| is_active(g)).collect();

    let average_progress = if goals.is_empty() {
        0.0
    } else {
        goals.iter().map(|g| g.progress).sum::<f64>() / goals.len() as f64
    };

    let mut goals_by_category = BTreeMap::new();
    for g in goals {
        *goals_by_category.entry(g.category.clone()).or_insert(0) += 1;
    }

    let average_check_in_score = if check_ins.is_empty() {
        0.0
    } else {
        check_ins.iter().map(|c| c.score).sum::<f64>() / check_ins.len() as f64
    };

    let mut check_in_distribution = BTreeMap::new();
    for c in check_ins {
        let key = distribution_key(c.created_at.date_naive(), distribution);
        *check_in_distribution.entry(key).or_insert(0) += 1;
    }

    PeriodAnalytics {
        total_goals: goals.len(),
        completed_goals,
        active_goals,
        average_progress,
        goals_by_category,
        total_check_ins: check_ins.len(),
        average_check_in_score,
        check_in_distribution,
    }
}

fn distribution_key(date: NaiveDate, distribution: Distribution) -> u32 {
    match distribution {
        Distribution::ByWeekday => date.weekday().num_days_from_sunday(),
        Distribution::ByWeekOfMonth => week_of_month(date),
        Distribution::ByMonth => date.month(),
    }
}

/// `ceil((day + weekday of the 1st) / 7)`, weekday counted from Sunday = 0.
pub fn week_of_month(date: NaiveDate) -> u32 {
    let first_weekday = date
        .with_day(1)
        .map(|d| d.weekday().num_days_from_sunday())
        .unwrap_or(0);
    (date.day() + first_weekday).div_ceil(7)
}
