//! Input sanitation shared by every coaching endpoint.

use crate::errors::AppError;

pub const MAX_GOAL_TITLE_CHARS: usize = 200;
pub const MAX_CATEGORY_CHARS: usize = 50;
pub const MAX_MOTIVATION_CHARS: usize = 2000;
pub const MAX_DESCRIPTION_CHARS: usize = 2000;
pub const MIN_REPORT_YEAR: i32 = 1;
pub const MAX_REPORT_YEAR: i32 = 9999;

/// Trims `value` and enforces presence and a character ceiling.
///
/// Returns `Ok(None)` only for an absent optional field. A present but blank
/// optional field comes back as `Some("")`.
pub fn sanitize_string(
    value: Option<&str>,
    field: &str,
    max_chars: usize,
    required: bool,
) -> Result<Option<String>, AppError> {
    let Some(raw) = value else {
        if required {
            return Err(AppError::Validation(format!("{field} is required")));
        }
        return Ok(None);
    };

    let trimmed = raw.trim();
    if required && trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    if trimmed.chars().count() > max_chars {
        return Err(AppError::Validation(format!(
            "{field} is too long (max {max_chars} characters)"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

/// Shorthand for a required field; the `Option` is always `Some` on success.
pub fn require_string(value: Option<&str>, field: &str, max_chars: usize) -> Result<String, AppError> {
    sanitize_string(value, field, max_chars, true)?
        .ok_or_else(|| AppError::Validation(format!("{field} is required")))
}

pub fn sanitize_array_size<T>(items: &[T], field: &str, max_items: usize) -> Result<(), AppError> {
    if items.len() > max_items {
        return Err(AppError::Validation(format!(
            "{field} is too large (max {max_items} items)"
        )));
    }
    Ok(())
}

/// Report years are calendar years with four digits at most.
pub fn require_year(year: i32) -> Result<i32, AppError> {
    if !(MIN_REPORT_YEAR..=MAX_REPORT_YEAR).contains(&year) {
        return Err(AppError::Validation(format!(
            "year must be between {MIN_REPORT_YEAR} and {MAX_REPORT_YEAR}"
        )));
    }
    Ok(year)
}

/// A principal may only ask about its own data.
pub fn require_owner(principal: &str, user_id: Option<&str>) -> Result<(), AppError> {
    match user_id {
        Some(id) if id == principal => Ok(()),
        _ => Err(AppError::Forbidden),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_string_is_trimmed() {
        let v = sanitize_string(Some("  Run daily  "), "goalTitle", 200, true).unwrap();
        assert_eq!(v.as_deref(), Some("Run daily"));
    }

    #[test]
    fn test_required_string_rejects_missing_and_blank() {
        assert!(matches!(
            sanitize_string(None, "goalTitle", 200, true),
            Err(AppError::Validation(m)) if m == "goalTitle is required"
        ));
        assert!(matches!(
            sanitize_string(Some("   "), "goalTitle", 200, true),
            Err(AppError::Validation(m)) if m == "goalTitle cannot be empty"
        ));
    }

    #[test]
    fn test_optional_string_may_be_absent() {
        assert_eq!(sanitize_string(None, "motivation", 2000, false).unwrap(), None);
    }

    #[test]
    fn test_length_counts_characters_after_trim() {
        let exactly = "ş".repeat(50);
        assert!(sanitize_string(Some(&format!(" {exactly} ")), "category", 50, true).is_ok());
        let over = "a".repeat(51);
        assert!(matches!(
            sanitize_string(Some(&over), "category", 50, true),
            Err(AppError::Validation(m)) if m.contains("max 50")
        ));
    }

    #[test]
    fn test_array_ceiling() {
        assert!(sanitize_array_size(&[0u8; 200], "goals", 200).is_ok());
        assert!(sanitize_array_size(&[0u8; 201], "goals", 200).is_err());
    }

    #[test]
    fn test_year_range() {
        assert_eq!(require_year(2025).unwrap(), 2025);
        assert!(require_year(1).is_ok());
        assert!(require_year(9999).is_ok());
        assert!(require_year(0).is_err());
        assert!(require_year(10_000).is_err());
        assert!(matches!(
            require_year(i32::MAX),
            Err(AppError::Validation(m)) if m == "year must be between 1 and 9999"
        ));
    }

    #[test]
    fn test_owner_check() {
        assert!(require_owner("u1", Some("u1")).is_ok());
        assert!(matches!(require_owner("u1", Some("u2")), Err(AppError::Forbidden)));
        assert!(matches!(require_owner("u1", None), Err(AppError::Forbidden)));
    }
}
