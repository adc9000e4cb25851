// 📅 Month Keys - Calendar months as ordered values
//
// Reports are keyed by calendar month ("YYYY-MM"). Keys are parsed and validated here,
// at the boundary, so everything past this point compares real months instead of strings.

use crate::error::InputError;
use chrono::{Datelike, Months, NaiveDate};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// MONTH
// ============================================================================

/// One calendar month. Field order gives the derived ordering: year, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Result<Self, InputError> {
        if !(0..=9999).contains(&year) || !(1..=12).contains(&month) {
            return Err(InputError::InvalidMonth(format!("{}-{:02}", year, month)));
        }
        Ok(Month { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First day of this month
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// The following calendar month (December rolls into January of the next year)
    pub fn succ(&self) -> Option<Month> {
        let next = self.first_day()?.checked_add_months(Months::new(1))?;
        Month::new(next.year(), next.month()).ok()
    }

    /// Month containing the given date
    pub fn of(date: NaiveDate) -> Month {
        Month {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = InputError;

    /// Strict YYYY-MM: four-digit year, dash, two-digit month
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InputError::InvalidMonth(s.to_string());
        let bytes = s.as_bytes();

        if bytes.len() != 7 || bytes[4] != b'-' {
            return Err(invalid());
        }
        let digits = |part: &[u8]| part.iter().all(u8::is_ascii_digit);
        if !digits(&bytes[..4]) || !digits(&bytes[5..]) {
            return Err(invalid());
        }

        let year: i32 = s[..4].parse().map_err(|_| invalid())?;
        let month: u32 = s[5..].parse().map_err(|_| invalid())?;
        Month::new(year, month).map_err(|_| invalid())
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl ToSql for Month {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for Month {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: InputError| FromSqlError::Other(Box::new(e)))
    }
}

// ============================================================================
// MONTH RANGE
// ============================================================================

/// Inclusive range of months, start never after end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "MonthBounds")]
pub struct MonthRange {
    start_month: Month,
    end_month: Month,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MonthBounds {
    start_month: Month,
    end_month: Month,
}

impl TryFrom<MonthBounds> for MonthRange {
    type Error = InputError;

    fn try_from(bounds: MonthBounds) -> Result<Self, Self::Error> {
        MonthRange::new(bounds.start_month, bounds.end_month)
    }
}

impl MonthRange {
    pub fn new(start_month: Month, end_month: Month) -> Result<Self, InputError> {
        if start_month > end_month {
            return Err(InputError::ReversedRange {
                start: start_month.to_string(),
                end: end_month.to_string(),
            });
        }
        Ok(MonthRange {
            start_month,
            end_month,
        })
    }

    /// Parse both bounds from YYYY-MM keys
    pub fn parse(start: &str, end: &str) -> Result<Self, InputError> {
        MonthRange::new(start.parse()?, end.parse()?)
    }

    pub fn start(&self) -> Month {
        self.start_month
    }

    pub fn end(&self) -> Month {
        self.end_month
    }

    /// Every month from start to end inclusive, one calendar month at a time
    pub fn months(&self) -> impl Iterator<Item = Month> {
        let end = self.end_month;
        std::iter::successors(Some(self.start_month), move |m| {
            m.succ().filter(|next| *next <= end)
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_month() {
        let month: Month = "2024-06".parse().unwrap();
        assert_eq!(month.year(), 2024);
        assert_eq!(month.month(), 6);
        assert_eq!(month.to_string(), "2024-06");
    }

    #[test]
    fn test_parse_rejects_malformed_keys() {
        for bad in ["2024-6", "2024-13", "2024-00", "24-06", "2024/06", "2024-06-01", "", "abcd-ef"] {
            assert_eq!(
                bad.parse::<Month>(),
                Err(InputError::InvalidMonth(bad.to_string())),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_ordering_is_chronological() {
        let nov: Month = "2024-11".parse().unwrap();
        let jan: Month = "2025-01".parse().unwrap();
        let feb: Month = "2024-02".parse().unwrap();
        assert!(feb < nov);
        assert!(nov < jan);
    }

    #[test]
    fn test_succ_rolls_over_year() {
        let dec: Month = "2024-12".parse().unwrap();
        assert_eq!(dec.succ().unwrap().to_string(), "2025-01");
    }

    #[test]
    fn test_range_walk_crosses_year_boundary() {
        let range = MonthRange::parse("2024-11", "2025-02").unwrap();
        let months: Vec<String> = range.months().map(|m| m.to_string()).collect();
        assert_eq!(months, vec!["2024-11", "2024-12", "2025-01", "2025-02"]);
        assert_eq!(range.months().count(), 4);
    }

    #[test]
    fn test_single_month_range() {
        let range = MonthRange::parse("2024-06", "2024-06").unwrap();
        let months: Vec<Month> = range.months().collect();
        assert_eq!(months, vec!["2024-06".parse::<Month>().unwrap()]);
    }

    #[test]
    fn test_reversed_range_rejected() {
        let err = MonthRange::parse("2024-05", "2024-01").unwrap_err();
        assert!(matches!(err, InputError::ReversedRange { .. }));
    }

    #[test]
    fn test_serde_uses_month_keys() {
        let range = MonthRange::parse("2024-01", "2024-03").unwrap();
        let json = serde_json::to_value(range).unwrap();
        assert_eq!(json, serde_json::json!({"startMonth": "2024-01", "endMonth": "2024-03"}));

        let back: MonthRange = serde_json::from_value(json).unwrap();
        assert_eq!(back, range);

        let reversed = serde_json::from_value::<MonthRange>(
            serde_json::json!({"startMonth": "2024-03", "endMonth": "2024-01"}),
        );
        assert!(reversed.is_err());
    }

    #[test]
    fn test_month_of_date() {
        let date = NaiveDate::from_ymd_opt(2023, 9, 17).unwrap();
        assert_eq!(Month::of(date).to_string(), "2023-09");
    }
}
