//! Output language selection and the localized strings used in prompts.
//!
//! Turkish is the default. Any locale other than `tr` selects English.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

const MONTH_NAMES_TR: [&str; 12] = [
    "Ocak", "Şubat", "Mart", "Nisan", "Mayıs", "Haziran", "Temmuz", "Ağustos", "Eylül", "Ekim",
    "Kasım", "Aralık",
];
const MONTH_NAMES_EN: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

// Sunday = 0
const DAY_NAMES_TR: [&str; 7] = [
    "Pazar",
    "Pazartesi",
    "Salı",
    "Çarşamba",
    "Perşembe",
    "Cuma",
    "Cumartesi",
];
const DAY_NAMES_EN: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Locale {
    #[default]
    Tr,
    En,
}

impl From<String> for Locale {
    fn from(s: String) -> Self {
        if s.trim().eq_ignore_ascii_case("tr") {
            Locale::Tr
        } else {
            Locale::En
        }
    }
}

impl From<Locale> for String {
    fn from(l: Locale) -> Self {
        l.code().to_string()
    }
}

impl Locale {
    pub fn code(&self) -> &'static str {
        match self {
            Locale::Tr => "tr",
            Locale::En => "en",
        }
    }

    pub fn language_name(&self) -> &'static str {
        match self {
            Locale::Tr => "Turkish",
            Locale::En => "English",
        }
    }

    pub fn language_instruction(&self) -> &'static str {
        match self {
            Locale::Tr => "OUTPUT LANGUAGE MUST BE TURKISH.",
            Locale::En => "OUTPUT LANGUAGE MUST BE ENGLISH.",
        }
    }

    pub fn coach_description(&self) -> &'static str {
        match self {
            Locale::Tr => "Sen deneyimli bir Türkçe konuşan kişisel gelişim koçusun.",
            Locale::En => {
                "You are an experienced personal development coach who communicates in English."
            }
        }
    }

    pub fn not_specified(&self) -> &'static str {
        match self {
            Locale::Tr => "Belirtilmemiş",
            Locale::En => "Not specified",
        }
    }

    pub fn no_note(&self) -> &'static str {
        match self {
            Locale::Tr => "Not yok",
            Locale::En => "No note",
        }
    }

    pub fn month_names(&self) -> &'static [&'static str; 12] {
        match self {
            Locale::Tr => &MONTH_NAMES_TR,
            Locale::En => &MONTH_NAMES_EN,
        }
    }

    pub fn day_names(&self) -> &'static [&'static str; 7] {
        match self {
            Locale::Tr => &DAY_NAMES_TR,
            Locale::En => &DAY_NAMES_EN,
        }
    }

    /// `1..=12` → month name. Out-of-range months yield `None`.
    pub fn month_name(&self, month: u32) -> Option<&'static str> {
        let idx = usize::try_from(month.checked_sub(1)?).ok()?;
        self.month_names().get(idx).copied()
    }

    /// Short numeric date: `M/D/YYYY` for English, `DD.MM.YYYY` for Turkish.
    pub fn short_date(&self, at: &DateTime<Utc>) -> String {
        match self {
            Locale::Tr => format!("{:02}.{:02}.{}", at.day(), at.month(), at.year()),
            Locale::En => format!("{}/{}/{}", at.month(), at.day(), at.year()),
        }
    }

    /// Total-duration phrase for a plan of `weeks` weeks or `months` months.
    pub fn duration_phrase(&self, amount: i64, unit: DurationUnit) -> String {
        match (self, unit) {
            (Locale::Tr, DurationUnit::Weeks) => format!("{amount} hafta boyunca"),
            (Locale::Tr, DurationUnit::Months) => format!("{amount} ay boyunca"),
            (Locale::En, DurationUnit::Weeks) if amount == 1 => "over 1 week".to_string(),
            (Locale::En, DurationUnit::Weeks) => format!("over {amount} weeks"),
            (Locale::En, DurationUnit::Months) if amount == 1 => "over 1 month".to_string(),
            (Locale::En, DurationUnit::Months) => format!("over {amount} months"),
        }
    }

    /// Used when no target date was given.
    pub fn default_duration_phrase(&self) -> &'static str {
        match self {
            Locale::Tr => "belirlenen süre boyunca",
            Locale::En => "over the chosen timeframe",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    Weeks,
    Months,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_unknown_locale_falls_back_to_english() {
        assert_eq!(Locale::from("tr".to_string()), Locale::Tr);
        assert_eq!(Locale::from("TR".to_string()), Locale::Tr);
        assert_eq!(Locale::from("de".to_string()), Locale::En);
        assert_eq!(Locale::from(String::new()), Locale::En);
    }

    #[test]
    fn test_missing_locale_defaults_to_turkish() {
        #[derive(Deserialize)]
        struct Body {
            #[serde(default)]
            locale: Locale,
        }
        let body: Body = serde_json::from_str("{}").unwrap();
        assert_eq!(body.locale, Locale::Tr);
        let body: Body = serde_json::from_str(r#"{"locale":"en"}"#).unwrap();
        assert_eq!(body.locale, Locale::En);
    }

    #[test]
    fn test_short_date_formats() {
        let d = Utc.with_ymd_and_hms(2025, 3, 7, 10, 0, 0).unwrap();
        assert_eq!(Locale::En.short_date(&d), "3/7/2025");
        assert_eq!(Locale::Tr.short_date(&d), "07.03.2025");
    }

    #[test]
    fn test_day_names_start_on_sunday() {
        assert_eq!(Locale::En.day_names()[0], "Sunday");
        assert_eq!(Locale::Tr.day_names()[0], "Pazar");
    }

    #[test]
    fn test_month_name_bounds() {
        assert_eq!(Locale::En.month_name(1), Some("January"));
        assert_eq!(Locale::Tr.month_name(12), Some("Aralık"));
        assert_eq!(Locale::En.month_name(0), None);
        assert_eq!(Locale::En.month_name(13), None);
    }
}
