//! Free-text coaching services: suggestions and the weekly, monthly and yearly reports.

use chrono::{DateTime, Utc};

use super::analytics::{calculate, Distribution};
use super::locale::Locale;
use super::models::{CheckIn, Goal};
use super::prompts::{
    build_monthly_report_prompt, build_suggestions_prompt, build_weekly_report_prompt,
    build_yearly_report_prompt,
};
use crate::llm_client::{LlmError, TextGenerator};

const SUGGESTIONS_MAX_TOKENS: u32 = 1500;
const WEEKLY_MAX_TOKENS: u32 = 3000;
const MONTHLY_MAX_TOKENS: u32 = 3500;
const YEARLY_MAX_TOKENS: u32 = 4000;

async fn generate_trimmed(
    llm: &dyn TextGenerator,
    prompt: &str,
    max_output_tokens: u32,
) -> Result<String, LlmError> {
    let text = llm.generate(prompt, max_output_tokens).await?;
    Ok(text.trim().to_string())
}

pub async fn generate_suggestions(
    llm: &dyn TextGenerator,
    goals: &[Goal],
    check_ins: &[CheckIn],
    locale: Locale,
) -> Result<String, LlmError> {
    let prompt = build_suggestions_prompt(goals, check_ins, locale);
    generate_trimmed(llm, &prompt, SUGGESTIONS_MAX_TOKENS).await
}

pub async fn generate_weekly_report(
    llm: &dyn TextGenerator,
    week_start: DateTime<Utc>,
    week_end: DateTime<Utc>,
    goals: &[Goal],
    check_ins: &[CheckIn],
    locale: Locale,
) -> Result<String, LlmError> {
    let analytics = calculate(goals, check_ins, Distribution::ByWeekday);
    let prompt =
        build_weekly_report_prompt(&week_start, &week_end, &analytics, goals, check_ins, locale);
    generate_trimmed(llm, &prompt, WEEKLY_MAX_TOKENS).await
}

pub async fn generate_monthly_report(
    llm: &dyn TextGenerator,
    year: i32,
    month: u32,
    goals: &[Goal],
    check_ins: &[CheckIn],
    locale: Locale,
) -> Result<String, LlmError> {
    let analytics = calculate(goals, check_ins, Distribution::ByWeekOfMonth);
    let prompt = build_monthly_report_prompt(year, month, &analytics, goals, check_ins, locale);
    generate_trimmed(llm, &prompt, MONTHLY_MAX_TOKENS).await
}

pub async fn generate_yearly_report(
    llm: &dyn TextGenerator,
    year: i32,
    goals: &[Goal],
    check_ins: &[CheckIn],
    locale: Locale,
) -> Result<String, LlmError> {
    let analytics = calculate(goals, check_ins, Distribution::ByMonth);
    let prompt = build_yearly_report_prompt(year, &analytics, goals, check_ins, locale);
    generate_trimmed(llm, &prompt, YEARLY_MAX_TOKENS).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<(String, u32)>>,
    }

    #[async_trait]
    impl TextGenerator for Recording {
        async fn generate(&self, prompt: &str, max: u32) -> Result<String, LlmError> {
            self.calls.lock().unwrap().push((prompt.to_string(), max));
            Ok("# Report".to_string())
        }
    }

    fn goal(category: &str, progress: f64) -> Goal {
        Goal {
            id: "g".into(),
            user_id: "u1".into(),
            title: "Read".into(),
            category: category.into(),
            created_at: None,
            target_date: None,
            description: None,
            motivation: None,
            progress,
            is_archived: false,
            is_completed: None,
        }
    }

    #[tokio::test]
    async fn test_suggestions_summarize_goals() {
        let llm = Recording::default();
        let goals = vec![goal("learning", 35.0)];
        let out = generate_suggestions(&llm, &goals, &[], Locale::En).await.unwrap();
        assert_eq!(out, "# Report");

        let calls = llm.calls.lock().unwrap();
        assert_eq!(calls[0].1, SUGGESTIONS_MAX_TOKENS);
        assert!(calls[0].0.contains("- Read (learning): 35% progress, active"));
        assert!(calls[0].0.contains("No check-ins recorded yet."));
        assert!(calls[0].0.contains("written in English"));
    }

    #[tokio::test]
    async fn test_monthly_report_uses_summary_and_token_budget() {
        let llm = Recording::default();
        let goals = vec![goal("learning", 100.0), goal("health", 20.0)];
        generate_monthly_report(&llm, 2025, 2, &goals, &[], Locale::Tr)
            .await
            .unwrap();

        let calls = llm.calls.lock().unwrap();
        let (prompt, max) = &calls[0];
        assert_eq!(*max, MONTHLY_MAX_TOKENS);
        assert!(prompt.contains("- Month: February 2025"));
        assert!(prompt.contains("- Completed goals: 1 (0 explicitly marked as completed)"));
        assert!(prompt.contains("- Average progress: 60.0%"));
        assert!(prompt.contains("No check-ins this month."));
        assert!(prompt.contains("written in Turkish"));
    }

    #[tokio::test]
    async fn test_yearly_report_token_budget() {
        let llm = Recording::default();
        generate_yearly_report(&llm, 2024, &[], &[], Locale::En)
            .await
            .unwrap();
        assert_eq!(llm.calls.lock().unwrap()[0].1, YEARLY_MAX_TOKENS);
    }
}
