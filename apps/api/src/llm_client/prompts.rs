// Shared prompt fragments. Each coaching service builds its own prompt in
// coaching/prompts.rs; this file only holds the cross-cutting pieces.

/// Appended to every prompt whose output is parsed as JSON.
pub const JSON_ONLY_INSTRUCTION: &str = "\
- Respond with VALID JSON ONLY. No markdown, no code blocks, no comments, no extra text.";

/// Appended to every prompt that may touch health or exercise goals.
pub const SAFETY_INSTRUCTION: &str = "\
- For health / exercise goals, give safe and reasonable suggestions. Do NOT give medical advice.";

/// Closing line for every free-text report.
pub const SECOND_PERSON_INSTRUCTION: &str =
    "Address the reader directly using second person (\"you\" / \"sen\").";

/// Closing instruction shared by every JSON prompt.
pub const PARSEABLE_JSON_REMINDER: &str =
    "- Return ONLY parseable JSON that exactly follows the schema above.";
