//! Validator: pure, total predicates and coercions used by the cleaners.
//!
//! None of these functions panic or log; a rejected value is simply `false` / `None`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("email pattern is valid")
});

/// Timestamp layouts accepted in addition to a bare `YYYY-MM-DD` date and RFC 3339
const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// `local@domain.tld`, anchored, matched case-sensitively against `s` as given
pub fn is_valid_email(s: &str) -> bool {
    EMAIL_RE.is_match(s)
}

/// Parse an integer. Integral decimals such as `"3.0"` are accepted; `"3.5"` is not.
pub fn coerce_integer(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(value) = s.parse::<i64>() {
        return Some(value);
    }
    let value = parse_decimal(s)?;
    if value.fract().is_zero() {
        value.to_i64()
    } else {
        None
    }
}

/// Parse a monetary amount
pub fn coerce_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    parse_decimal(s)
}

/// Parse an ISO 8601 date (`YYYY-MM-DD`) or timestamp. Offsets are normalised to UTC.
pub fn coerce_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.naive_utc());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}
