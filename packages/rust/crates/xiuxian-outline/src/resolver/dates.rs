use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

use crate::compile_regex;

static SEPARATED_DATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"^(\d{4})[^\d](\d{1,2})[^\d](\d{1,2})$"));
static ORDINAL_SUFFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b"));

const NATURAL_DATE_FORMATS: &[&str] = &["%B %d %Y", "%d %B %Y", "%A %B %d %Y", "%A %d %B %Y"];

fn strip_page_decorations(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix("journals/").unwrap_or(trimmed);
    let lower = trimmed.to_ascii_lowercase();
    for ext in [".md", ".org"] {
        if lower.ends_with(ext) {
            return &trimmed[..trimmed.len() - ext.len()];
        }
    }
    trimmed
}

fn parse_numeric_date(raw: &str) -> Option<NaiveDate> {
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        let year = raw[0..4].parse::<i32>().ok()?;
        let month = raw[4..6].parse::<u32>().ok()?;
        let day = raw[6..8].parse::<u32>().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    let caps = SEPARATED_DATE_REGEX.captures(raw)?;
    let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
    let month = caps.get(2)?.as_str().parse::<u32>().ok()?;
    let day = caps.get(3)?.as_str().parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_natural_date(raw: &str) -> Option<NaiveDate> {
    if !raw.chars().any(char::is_alphabetic) {
        return None;
    }
    let without_ordinals = ORDINAL_SUFFIX_REGEX.replace_all(raw, "$1");
    let normalized = without_ordinals
        .replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    NATURAL_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&normalized, format).ok())
}

/// Parse a page name as a calendar date.
///
/// Accepts `20250101`, `2025-01-01` / `2025_01_01` / `2025/01/01` (any single
/// separator), and phrases such as `Jan 1st, 2025` or `Wed, 1 January 2025`.
/// A `journals/` prefix and `.md`/`.org` extension are ignored.
#[must_use]
pub fn parse_journal_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = strip_page_decorations(raw);
    if cleaned.is_empty() {
        return None;
    }
    parse_numeric_date(cleaned).or_else(|| parse_natural_date(cleaned))
}

/// Canonical journal file base, `YYYY_MM_DD`.
#[must_use]
pub fn journal_file_base(date: NaiveDate) -> String {
    format!("{:04}_{:02}_{:02}", date.year(), date.month(), date.day())
}

/// Slash-delimited journal form, `YYYY/MM/DD`.
#[must_use]
pub fn journal_slash_form(date: NaiveDate) -> String {
    format!("{:04}/{:02}/{:02}", date.year(), date.month(), date.day())
}

/// Canonical journal page name for a date-like reference, if any.
#[must_use]
pub fn canonical_journal_name(raw: &str) -> Option<String> {
    parse_journal_date(raw).map(journal_file_base)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_numeric_forms() {
        assert_eq!(parse_journal_date("20250101"), ymd(2025, 1, 1));
        assert_eq!(parse_journal_date("2025-01-01"), ymd(2025, 1, 1));
        assert_eq!(parse_journal_date("2025/1/9"), ymd(2025, 1, 9));
        assert_eq!(parse_journal_date("journals/2024_02_29.md"), ymd(2024, 2, 29));
    }

    #[test]
    fn test_invalid_calendar_dates_are_rejected() {
        assert_eq!(parse_journal_date("2025-02-30"), None);
        assert_eq!(parse_journal_date("20251301"), None);
        assert_eq!(parse_journal_date("project plan"), None);
        assert_eq!(parse_journal_date(""), None);
    }

    #[test]
    fn test_natural_language_phrases() {
        assert_eq!(parse_journal_date("Jan 1st, 2025"), ymd(2025, 1, 1));
        assert_eq!(parse_journal_date("January 22nd, 2024"), ymd(2024, 1, 22));
        assert_eq!(parse_journal_date("3 March 2023"), ymd(2023, 3, 3));
        assert_eq!(parse_journal_date("Wed, Jan 1st, 2025"), ymd(2025, 1, 1));
    }

    #[test]
    fn test_canonical_forms() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap_or_default();
        assert_eq!(journal_file_base(date), "2025_03_07");
        assert_eq!(journal_slash_form(date), "2025/03/07");
        assert_eq!(
            canonical_journal_name("Mar 7th, 2025").as_deref(),
            Some("2025_03_07")
        );
    }
}
