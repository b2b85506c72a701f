//! Date normalization for the loose date forms found in source files.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static YEAR_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})$").unwrap());

static MONTH_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})$").unwrap());

static QUARTER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-Q(\d)$").unwrap());

static ISO_DATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap()
});

/// Normalize `YYYY`, `YYYY-MM`, `YYYY-Qn` or `YYYY-MM-DD` to a calendar date.
///
/// Returns `None` for any other form and for dates that do not exist.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    if let Some(caps) = YEAR_REGEX.captures(raw) {
        return NaiveDate::from_ymd_opt(caps[1].parse().ok()?, 1, 1);
    }
    if let Some(caps) = MONTH_REGEX.captures(raw) {
        return NaiveDate::from_ymd_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, 1);
    }
    if let Some(caps) = QUARTER_REGEX.captures(raw) {
        let quarter: u32 = caps[2].parse().ok()?;
        if !(1..=4).contains(&quarter) {
            return None;
        }
        return NaiveDate::from_ymd_opt(caps[1].parse().ok()?, 3 * (quarter - 1) + 1, 1);
    }
    if let Some(caps) = ISO_DATE_REGEX.captures(raw) {
        return NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        );
    }
    None
}

/// [`normalize_date`] rendered as `YYYY-MM-DD`
pub fn normalize_date_str(raw: &str) -> Option<String> {
    normalize_date(raw).map(|d| d.format("%Y-%m-%d").to_string())
}
