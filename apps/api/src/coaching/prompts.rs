// All LLM prompt templates for the coaching services.
// Reuses cross-cutting fragments from llm_client::prompts.
//
// Placeholders carrying user-supplied text are substituted last so that a
// literal `{...}` in a goal title cannot be expanded by a later replace.

use chrono::{DateTime, Datelike, Utc};

use super::analytics::PeriodAnalytics;
use super::locale::Locale;
use super::models::{CheckIn, Goal};
use crate::llm_client::prompts::{
    JSON_ONLY_INSTRUCTION, PARSEABLE_JSON_REMINDER, SAFETY_INSTRUCTION, SECOND_PERSON_INSTRUCTION,
};

/// Monthly reports quote only the most recent notes.
pub const MONTHLY_NOTE_LIMIT: usize = 15;
pub const YEARLY_NOTE_LIMIT: usize = 10;

// ────────────────────────────────────────────────────────────────────────────
// Templates
// ────────────────────────────────────────────────────────────────────────────

/// Goal optimization prompt. Produces a SMART goal plus 3–5 sub-goals as JSON.
pub const OPTIMIZE_GOAL_PROMPT_TEMPLATE: &str = r#"{coach_description}

Task:
- Convert the given goal into a full SMART goal (Specific, Measurable, Achievable, Relevant, Time-bound).
- Generate 3–5 clear and actionable sub-goals that help the user reach this goal.

Input:
- Goal: "{goal_title}"
- Category: {category}
- Motivation: {motivation}
- Target deadline information: {time_constraint}

Language & output rules:
- {language_instruction}
{json_only}
{safety}
- When you need a date, use ISO format (YYYY-MM-DD) or null.

JSON SCHEMA (use exactly these fields):
{
  "optimizedTitle": "Short, clear and motivating goal name in {language_name} (max 5 words)",
  "subGoals": [
    {
      "id": "unique-id",
      "title": "Short, clear and measurable sub-goal in {language_name}",
      "isCompleted": false,
      "dueDate": "YYYY-MM-DD or null"
    }
  ],
  "explanation": "The full SMART version of the goal in {language_name}, 1–2 clear sentences."
}

IMPORTANT:
- "optimizedTitle" must always be a SHORT name; ideally 3–4 words, maximum 5. Leave time, amount and measurability details to the explanation field.
- Generate between 3 and 5 sub-goals that form a step-by-step roadmap.
- When you mention the TOTAL duration, reuse exactly this phrase: "{duration_phrase}". Do NOT invent a different total duration.
{parseable_json}"#;

/// Lightweight sub-goal ideas. Produces `{"subGoals": [{"title": ...}]}`.
pub const SUGGEST_SUB_GOALS_PROMPT_TEMPLATE: &str = r#"You are a personal development and productivity coach.

Task:
- For the given goal, suggest 3–6 practical and clear sub-goals.

Input:
- Goal title: "{goal_title}"
- Category: {category}
- Goal description / context: {description}

Language & safety rules:
- {language_instruction}
{json_only}
{safety}
- Sub-goals must be short, clear and doable in a single step.

JSON SCHEMA (use exactly this structure):
{
  "subGoals": [
    { "title": "Clear and actionable sub-goal in {language_name} (single sentence)" }
  ]
}

IMPORTANT:
- Generate between 3 and 6 sub-goals.
- All sub-goal titles must be written in {language_name}.
{parseable_json}"#;

pub const SUGGESTIONS_PROMPT_TEMPLATE: &str = r#"You are a practical personal development coach who understands that real life is messy, progress is rarely linear, and perfection is not the goal.

Task:
- Based on the user's goals and check-in history, provide realistic, balanced, and actionable suggestions.

Data:
User's goals:
{goals_summary}

Check-in summary:
{check_ins_summary}

Writing rules:
- {language_instruction}
- Tone: Honest, balanced, and constructive. Avoid toxic positivity.
- Format: Use Markdown, with at most 2 heading levels (#, ##) and numbered lists where helpful.
- Length: Around 150–220 words in total.

Content structure:
1. **Honest assessment**: what's working AND what isn't, using the actual progress data.
2. **Practical improvements**: the biggest bottlenecks and specific adjustments.
3. **1-2 realistic new goal ideas** based on the user's actual categories.
4. **3-4 practical sustainability tips** that work when motivation is low.

IMPORTANT: Your entire response must be written in {language_name}."#;

pub const WEEKLY_REPORT_PROMPT_TEMPLATE: &str = r#"You are an experienced personal development analyst and coach. Analyze the weekly data from {start} to {end} and write a concise, clear, and easy-to-read weekly report.

SUMMARY DATA:
- Week: {start} - {end}
{summary}
- Average check-in score: {average_score}/10
- Daily distribution: {distribution}

Goals by category:
{categories}

Goal details:
{goal_details}

All check-in notes:
{notes}

Writing rules:
- {language_instruction}
- Tone: Warm, friendly and supportive, but not overly emotional.
- Format: Use Markdown headings (#, ##, ###).
- Length: Maximum 200–250 words.

REPORT SECTIONS (in this order, 2–3 sentences each):

# Weekly Report: {start} - {end}

## 1. Week Overview
## 2. Goal Progress
## 3. Challenges & Solutions
## 4. AI Recommendations

IMPORTANT: Your entire response must be written in {language_name}. {second_person}"#;

pub const MONTHLY_REPORT_PROMPT_TEMPLATE: &str = r#"You are an experienced personal development analyst and coach. Analyze the {period} data and write a concise, clear, and easy-to-read monthly report.

SUMMARY DATA:
- Month: {period}
{summary}
- Average check-in score: {average_score}/10
- Weekly distribution: {distribution}

Goals by category:
{categories}

Goal details:
{goal_details}

Last {note_limit} check-in notes:
{notes}

Writing rules:
- {language_instruction}
- Tone: Warm, friendly and supportive, but not overly emotional.
- Format: Use Markdown headings (#, ##, ###).
- Length: Maximum 250–300 words.

REPORT SECTIONS (in this order, 2–3 sentences each):

# {period} Monthly Report

## 1. Month Overview
## 2. Goal Progress
## 3. Emotional and Mental Journey
## 4. Best Moments and Milestones of the Month
## 5. Lessons Learned
## 6. Recommendations for Next Month

IMPORTANT: Your entire response must be written in {language_name}. {second_person}"#;

pub const YEARLY_REPORT_PROMPT_TEMPLATE: &str = r#"You are a practical personal development analyst who understands that real progress is rarely linear. Analyze the {year} data and write an honest, balanced, and insightful yearly report.

SUMMARY DATA:
- Year: {year}
{summary}
- Monthly distribution: {distribution}

Goals by category:
{categories}

Goal details:
{goal_details}

Last {note_limit} check-in notes:
{notes}

Writing rules:
- {language_instruction}
- Tone: Honest, balanced, and constructive. Celebrate genuine wins AND acknowledge real challenges.
- Format: Use Markdown headings (#, ##, ###).
- Length: Maximum 300–350 words.

REPORT SECTIONS (in this order, 2–3 sentences each):

# {year} Personal Development Report

## 1. Year Overview
## 2. Goal Progress
## 3. Emotional and Mental Journey
## 4. Best Moments and Milestones
## 5. Lessons Learned
## 6. Recommendations for {next_year}
## 7. A Note to Yourself

IMPORTANT: Your entire response must be written in {language_name}. {second_person}"#;

// ────────────────────────────────────────────────────────────────────────────
// Builders
// ────────────────────────────────────────────────────────────────────────────

pub fn build_optimize_goal_prompt(
    goal_title: &str,
    category: &str,
    motivation: Option<&str>,
    time_constraint: &str,
    duration_phrase: &str,
    locale: Locale,
) -> String {
    OPTIMIZE_GOAL_PROMPT_TEMPLATE
        .replace("{coach_description}", locale.coach_description())
        .replace("{language_instruction}", locale.language_instruction())
        .replace("{language_name}", locale.language_name())
        .replace("{json_only}", JSON_ONLY_INSTRUCTION)
        .replace("{safety}", SAFETY_INSTRUCTION)
        .replace("{parseable_json}", PARSEABLE_JSON_REMINDER)
        .replace("{time_constraint}", time_constraint)
        .replace("{duration_phrase}", duration_phrase)
        .replace("{motivation}", motivation.unwrap_or(locale.not_specified()))
        .replace("{category}", category)
        .replace("{goal_title}", goal_title)
}

pub fn build_sub_goals_prompt(
    goal_title: &str,
    category: &str,
    description: Option<&str>,
    locale: Locale,
) -> String {
    SUGGEST_SUB_GOALS_PROMPT_TEMPLATE
        .replace("{language_instruction}", locale.language_instruction())
        .replace("{language_name}", locale.language_name())
        .replace("{json_only}", JSON_ONLY_INSTRUCTION)
        .replace("{safety}", SAFETY_INSTRUCTION)
        .replace("{parseable_json}", PARSEABLE_JSON_REMINDER)
        .replace("{description}", description.unwrap_or("Not specified"))
        .replace("{category}", category)
        .replace("{goal_title}", goal_title)
}

pub fn build_suggestions_prompt(goals: &[Goal], check_ins: &[CheckIn], locale: Locale) -> String {
    let goals_summary = goals
        .iter()
        .map(|g| {
            let state = if g.is_archived { "completed" } else { "active" };
            format!("- {} ({}): {}% progress, {state}", g.title, g.category, g.progress)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let check_ins_summary = if check_ins.is_empty() {
        "No check-ins recorded yet.".to_string()
    } else {
        format!("Total {} check-ins recorded.", check_ins.len())
    };

    SUGGESTIONS_PROMPT_TEMPLATE
        .replace("{language_instruction}", locale.language_instruction())
        .replace("{language_name}", locale.language_name())
        .replace("{check_ins_summary}", &check_ins_summary)
        .replace("{goals_summary}", &goals_summary)
}

pub fn build_weekly_report_prompt(
    week_start: &DateTime<Utc>,
    week_end: &DateTime<Utc>,
    analytics: &PeriodAnalytics<'_>,
    goals: &[Goal],
    check_ins: &[CheckIn],
    locale: Locale,
) -> String {
    // Prompt scaffolding is always English; only the output language varies.
    let day_names = Locale::En.day_names();
    let start = header_date(week_start);
    let end = header_date(week_end);

    let distribution = analytics
        .check_in_distribution
        .iter()
        .map(|(day, count)| {
            let name = day_names.get(*day as usize).copied().unwrap_or("?");
            format!("{name}: {}", plural(*count, "check-in"))
        })
        .collect::<Vec<_>>()
        .join(", ");

    let notes = if check_ins.is_empty() {
        "No check-ins this week.".to_string()
    } else {
        check_in_notes(check_ins, Some(locale), locale)
    };

    WEEKLY_REPORT_PROMPT_TEMPLATE
        .replace("{language_instruction}", locale.language_instruction())
        .replace("{language_name}", locale.language_name())
        .replace("{second_person}", SECOND_PERSON_INSTRUCTION)
        .replace("{start}", &start)
        .replace("{end}", &end)
        .replace("{summary}", &summary_lines(analytics))
        .replace("{average_score}", &format!("{:.1}", analytics.average_check_in_score))
        .replace("{distribution}", &distribution)
        .replace("{categories}", &category_lines(analytics))
        .replace("{notes}", &notes)
        .replace("{goal_details}", &goal_details(goals))
}

pub fn build_monthly_report_prompt(
    year: i32,
    month: u32,
    analytics: &PeriodAnalytics<'_>,
    goals: &[Goal],
    check_ins: &[CheckIn],
    locale: Locale,
) -> String {
    let month_name = Locale::En.month_name(month).unwrap_or("?");
    let period = format!("{month_name} {year}");

    let distribution = analytics
        .check_in_distribution
        .iter()
        .map(|(week, count)| format!("Week {week}: {}", plural(*count, "check-in")))
        .collect::<Vec<_>>()
        .join(", ");

    let notes = if check_ins.is_empty() {
        "No check-ins this month.".to_string()
    } else {
        check_in_notes(last_n(check_ins, MONTHLY_NOTE_LIMIT), Some(Locale::En), locale)
    };

    MONTHLY_REPORT_PROMPT_TEMPLATE
        .replace("{language_instruction}", locale.language_instruction())
        .replace("{language_name}", locale.language_name())
        .replace("{second_person}", SECOND_PERSON_INSTRUCTION)
        .replace("{period}", &period)
        .replace("{note_limit}", &MONTHLY_NOTE_LIMIT.to_string())
        .replace("{summary}", &summary_lines(analytics))
        .replace("{average_score}", &format!("{:.1}", analytics.average_check_in_score))
        .replace("{distribution}", &distribution)
        .replace("{categories}", &category_lines(analytics))
        .replace("{notes}", &notes)
        .replace("{goal_details}", &goal_details(goals))
}

pub fn build_yearly_report_prompt(
    year: i32,
    analytics: &PeriodAnalytics<'_>,
    goals: &[Goal],
    check_ins: &[CheckIn],
    locale: Locale,
) -> String {
    let distribution = analytics
        .check_in_distribution
        .iter()
        .map(|(month, count)| {
            let name = Locale::En.month_name(*month).unwrap_or("?");
            format!("{name}: {}", plural(*count, "check-in"))
        })
        .collect::<Vec<_>>()
        .join(", ");

    let notes = check_in_notes(last_n(check_ins, YEARLY_NOTE_LIMIT), None, locale);

    YEARLY_REPORT_PROMPT_TEMPLATE
        .replace("{language_instruction}", locale.language_instruction())
        .replace("{language_name}", locale.language_name())
        .replace("{second_person}", SECOND_PERSON_INSTRUCTION)
        .replace("{next_year}", &year.saturating_add(1).to_string())
        .replace("{year}", &year.to_string())
        .replace("{note_limit}", &YEARLY_NOTE_LIMIT.to_string())
        .replace("{summary}", &summary_lines(analytics))
        .replace("{distribution}", &distribution)
        .replace("{categories}", &category_lines(analytics))
        .replace("{notes}", &notes)
        .replace("{goal_details}", &goal_details(goals))
}

// ────────────────────────────────────────────────────────────────────────────
// Fragments
// ────────────────────────────────────────────────────────────────────────────

/// `M/D/YYYY (DayName)`, English day names.
fn header_date(at: &DateTime<Utc>) -> String {
    let day = Locale::En.day_names()[at.weekday().num_days_from_sunday() as usize];
    format!("{}/{}/{} ({day})", at.month(), at.day(), at.year())
}

fn plural(count: usize, noun: &str) -> String {
    if count > 1 {
        format!("{count} {noun}s")
    } else {
        format!("{count} {noun}")
    }
}

fn last_n<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

fn summary_lines(a: &PeriodAnalytics<'_>) -> String {
    format!(
        "- Total goals: {}\n- Completed goals: {} ({} explicitly marked as completed)\n- Active goals: {}\n- Average progress: {:.1}%\n- Total check-ins: {}",
        a.total_goals,
        a.completed_goals.len(),
        a.explicitly_completed(),
        a.active_goals.len(),
        a.average_progress,
        a.total_check_ins,
    )
}

fn category_lines(a: &PeriodAnalytics<'_>) -> String {
    a.goals_by_category
        .iter()
        .map(|(cat, count)| format!("- {cat}: {}", plural(*count, "goal")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn goal_details(goals: &[Goal]) -> String {
    goals
        .iter()
        .map(|g| {
            let completed = if g.explicitly_completed() { " [COMPLETED]" } else { "" };
            let context = match (&g.description, &g.motivation) {
                (Some(d), _) if !d.is_empty() => format!(", Description: {d}"),
                (_, Some(m)) if !m.is_empty() => format!(", Motivation: {m}"),
                _ => String::new(),
            };
            format!(
                "- \"{}\" ({}): {}% progress{completed}{context}",
                g.title, g.category, g.progress
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line per check-in. `date_locale` of `None` omits the date.
fn check_in_notes(check_ins: &[CheckIn], date_locale: Option<Locale>, locale: Locale) -> String {
    check_ins
        .iter()
        .map(|c| {
            let note = c
                .note
                .as_deref()
                .filter(|n| !n.is_empty())
                .unwrap_or(locale.no_note());
            match date_locale {
                Some(dl) => {
                    let sign = if c.progress_delta > 0.0 { "+" } else { "" };
                    format!(
                        "- {}: {note} (Score: {}/10, Progress: {sign}{}%)",
                        dl.short_date(&c.created_at),
                        c.score,
                        c.progress_delta
                    )
                }
                None => format!("- {note} (Score: {}/10)", c.score),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
