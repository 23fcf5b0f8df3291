//! Raw record to canonical [`Article`] normalization.
//!
//! Sources hand over a [`RawArticle`] whose fields still carry whatever the
//! backend sent. This module trims values, turns blanks into `None`, and
//! parses the publication date as leniently as it reasonably can. A date that
//! cannot be parsed is kept verbatim.

use crate::models::{Article, Published, RawArticle, Stock};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static ORDINAL_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").expect("valid ordinal regex"));

static LEADING_WEEKDAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(mon|tue|tues|wed|thu|thur|thurs|fri|sat|sun)[a-z]*\.?,?\s+")
        .expect("valid weekday regex")
});

static TRAILING_UTC_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+(utc|gmt|z)$").expect("valid zone regex"));

/// Layouts with an explicit numeric offset.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%d %b %Y %H:%M:%S %z",
    "%b %d, %Y %H:%M:%S %z",
    "%d %B %Y %H:%M:%S %z",
    "%B %d, %Y %H:%M:%S %z",
];

/// Layouts without an offset; interpreted as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M",
    "%b %d, %Y %H:%M:%S",
    "%b %d, %Y %H:%M",
    "%b %d, %Y %I:%M %p",
    "%b %d, %Y, %I:%M %p",
    "%d %b %Y, %I:%M %p",
    "%d %B %Y %H:%M:%S",
    "%d %B %Y %H:%M",
    "%B %d, %Y %H:%M:%S",
    "%B %d, %Y %H:%M",
    "%B %d, %Y %I:%M %p",
    "%B %d, %Y, %I:%M %p",
    "%d %B %Y, %I:%M %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Date-only layouts; interpreted as midnight UTC. `%b` takes three-letter
/// month names only, so each has a `%B` twin for full names.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d %b, %Y",
    "%d %B, %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%m/%d/%Y",
    "%Y%m%d",
];

/// Normalize one backend record for `stock`.
pub fn normalize(stock: &Stock, raw: &RawArticle) -> Article {
    Article {
        stock: stock.clone(),
        title: clean(raw.title.as_deref()),
        url: clean(raw.url.as_deref()),
        publisher: clean(raw.publisher.as_deref()),
        published: normalize_published(raw.published.as_deref()),
        description: clean(raw.description.as_deref()),
    }
}

/// Resolve a raw date string into a [`Published`] value.
pub fn normalize_published(raw: Option<&str>) -> Published {
    let Some(raw) = raw else {
        return Published::Absent;
    };
    if raw.trim().is_empty() {
        return Published::Absent;
    }
    match parse_datetime(raw) {
        Some(ts) => Published::Timestamp(ts),
        None => {
            debug!(raw, "Unparseable published date; keeping original text");
            Published::Unparsed(raw.to_string())
        }
    }
}

/// Lenient date parsing. Returns `None` instead of failing.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let without_weekday = LEADING_WEEKDAY.replace(trimmed, "");
    let without_ordinals = ORDINAL_SUFFIX.replace_all(&without_weekday, "$1");
    let cleaned = TRAILING_UTC_NAME.replace(&without_ordinals, "");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&cleaned, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, fmt) {
            return Some(dt.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}

fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
