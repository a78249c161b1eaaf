use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[a-zA-Z0-9]+$").expect("valid email regex"));

/// `YYYY-MM-DD` with real month/day ranges (leap years honored).
pub fn validate_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

/// 24-hour `HH:MM`.
pub fn validate_time(value: &str) -> bool {
    NaiveTime::parse_from_str(value, "%H:%M").is_ok()
}

/// Syntactic `local@domain.tld` shape only; no deliverability check.
pub fn validate_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}
