//! Lookback window resolution.
//!
//! A period label ("1 Month", "3 Months", "6 Months") resolves to a
//! [`PeriodSpec`] carrying both the coarse token some backends take and the
//! explicit inclusive date range others need.

use crate::error::ConfigError;
use chrono::{Duration, NaiveDate, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The supported news lookback windows. Serializes as its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    OneMonth,
    ThreeMonths,
    SixMonths,
}

impl Period {
    pub const ALL: [Period; 3] = [Period::OneMonth, Period::ThreeMonths, Period::SixMonths];

    /// Human-readable label, as shown to the user.
    pub fn label(self) -> &'static str {
        match self {
            Period::OneMonth => "1 Month",
            Period::ThreeMonths => "3 Months",
            Period::SixMonths => "6 Months",
        }
    }

    /// Length of the window in days.
    pub fn days(self) -> i64 {
        match self {
            Period::OneMonth => 30,
            Period::ThreeMonths => 90,
            Period::SixMonths => 180,
        }
    }

    /// Coarse backend token (`when:` operator on Google News).
    pub fn token(self) -> &'static str {
        match self {
            Period::OneMonth => "1m",
            Period::ThreeMonths => "3m",
            Period::SixMonths => "6m",
        }
    }

    /// Google Custom Search `dateRestrict` value.
    pub fn date_restrict(self) -> &'static str {
        match self {
            Period::OneMonth => "m1",
            Period::ThreeMonths => "m3",
            Period::SixMonths => "m6",
        }
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Period {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        match normalized.as_str() {
            "1 month" | "1m" => Ok(Period::OneMonth),
            "3 months" | "3m" => Ok(Period::ThreeMonths),
            "6 months" | "6m" => Ok(Period::SixMonths),
            _ => Err(ConfigError::UnknownPeriod(s.to_string())),
        }
    }
}

/// Concrete query parameters for one period, computed at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodSpec {
    pub period: Period,
    pub token: &'static str,
    /// First day of the window, inclusive.
    pub start: NaiveDate,
    /// Last day of the window (today), inclusive.
    pub end: NaiveDate,
}

/// Resolve a label against today's UTC date.
pub fn resolve(label: &str) -> Result<PeriodSpec, ConfigError> {
    resolve_at(label, Utc::now().date_naive())
}

/// Resolve a label against a fixed `today`.
pub fn resolve_at(label: &str, today: NaiveDate) -> Result<PeriodSpec, ConfigError> {
    let period: Period = label.parse()?;
    Ok(PeriodSpec {
        period,
        token: period.token(),
        start: today - Duration::days(period.days()),
        end: today,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_resolve_one_month() {
        let spec = resolve_at("1 Month", day(2024, 3, 31)).unwrap();
        assert_eq!(spec.period, Period::OneMonth);
        assert_eq!(spec.token, "1m");
        assert_eq!(spec.start, day(2024, 3, 1));
        assert_eq!(spec.end, day(2024, 3, 31));
    }

    #[test]
    fn test_resolve_six_months_crosses_year() {
        let spec = resolve_at("6 Months", day(2024, 2, 1)).unwrap();
        assert_eq!(spec.token, "6m");
        assert_eq!(spec.start, day(2023, 8, 5));
    }

    #[test]
    fn test_labels_are_lenient_about_case_and_spacing() {
        assert_eq!("3  months".parse::<Period>().unwrap(), Period::ThreeMonths);
        assert_eq!(" 6 MONTHS ".parse::<Period>().unwrap(), Period::SixMonths);
        assert_eq!("1m".parse::<Period>().unwrap(), Period::OneMonth);
    }

    #[test]
    fn test_unknown_label_is_an_error() {
        let err = resolve_at("2 Weeks", day(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPeriod(ref s) if s == "2 Weeks"));
    }

    #[test]
    fn test_period_spec_serializes_label() {
        let spec = resolve_at("3 Months", day(2024, 3, 31)).unwrap();
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["period"], "3 Months");
        assert_eq!(json["token"], "3m");
        assert_eq!(json["start"], "2024-01-01");
    }

    #[test]
    fn test_label_round_trip() {
        for period in Period::ALL {
            assert_eq!(period.label().parse::<Period>().unwrap(), period);
        }
    }

    #[test]
    fn test_date_restrict_tokens() {
        assert_eq!(Period::OneMonth.date_restrict(), "m1");
        assert_eq!(Period::ThreeMonths.date_restrict(), "m3");
        assert_eq!(Period::SixMonths.date_restrict(), "m6");
    }
}
