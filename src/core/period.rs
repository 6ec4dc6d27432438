//! Calendar-month reporting periods (`YYYY-MM`) and the one-entry-per-period guard.

use crate::{
    entities::kpi_entry,
    errors::{Error, FieldError, Result},
};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use std::{fmt, str::FromStr};

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    /// Builds a period, rejecting months outside 1..=12 and years outside 0..=9999.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] for out-of-range components.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) || !(0..=9999).contains(&year) {
            return Err(invalid_period(&format!("{year}-{month}")));
        }
        Ok(Self { year, month })
    }

    /// The period containing `at`.
    #[must_use]
    pub fn containing(at: DateTime<Utc>) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
        }
    }

    /// Calendar year
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Month number, 1..=12
    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// First instant of the month, UTC.
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        month_start(self.year, self.month)
    }

    /// First instant of the following month, UTC (exclusive end of this period).
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.next().start()
    }

    /// First instant of this period's year, UTC.
    #[must_use]
    pub fn year_start(&self) -> DateTime<Utc> {
        month_start(self.year, 1)
    }

    /// The following month.
    #[must_use]
    pub const fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// The preceding month.
    #[must_use]
    pub const fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Whether `at` falls in this month (UTC).
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at.year() == self.year && at.month() == self.month
    }

    /// Long display form, e.g. `March 2025`.
    #[must_use]
    pub fn long_name(&self) -> String {
        self.start().format("%B %Y").to_string()
    }
}

fn month_start(year: i32, month: u32) -> DateTime<Utc> {
    // Period::new bounds year and month, so the date always exists.
    let date = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default();
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

fn invalid_period(raw: &str) -> Error {
    Error::invalid_fields(
        format!("Invalid period '{raw}'. Use the YYYY-MM format (e.g. 2025-10)"),
        vec![FieldError::new("period", "must match YYYY-MM with month 01-12")],
    )
}

impl FromStr for Period {
    type Err = Error;

    /// Accepts exactly `^\d{4}-(0[1-9]|1[0-2])$`.
    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        let well_formed = bytes.len() == 7
            && bytes[4] == b'-'
            && bytes[..4].iter().all(u8::is_ascii_digit)
            && bytes[5..].iter().all(u8::is_ascii_digit);
        if !well_formed {
            return Err(invalid_period(s));
        }

        let year: i32 = s[..4].parse().map_err(|_| invalid_period(s))?;
        let month: u32 = s[5..].parse().map_err(|_| invalid_period(s))?;
        Self::new(year, month).map_err(|_| invalid_period(s))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Finds the entry for `indicator` recorded in `period`, if any.
///
/// Matching compares the year and month of `recorded_at`.
#[must_use]
pub fn has_entry_for_period<'a>(
    entries: &'a [kpi_entry::Model],
    indicator: &str,
    period: &Period,
) -> Option<&'a kpi_entry::Model> {
    entries
        .iter()
        .find(|e| e.indicator == indicator && period.contains(e.recorded_at))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::entry_model;

    #[test]
    fn test_parse_valid_periods() {
        let p: Period = "2025-03".parse().unwrap();
        assert_eq!((p.year(), p.month()), (2025, 3));
        assert_eq!(p.to_string(), "2025-03");
        assert_eq!("1999-12".parse::<Period>().unwrap().month(), 12);
    }

    #[test]
    fn test_parse_rejects_malformed_periods() {
        for raw in ["2025-13", "25-03", "2025-00", "2025-3", "2025/03", "2025-03-01", "", "abcd-ef"] {
            let result = raw.parse::<Period>();
            assert!(
                matches!(result, Err(Error::Validation { .. })),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_windows_are_utc_month_boundaries() {
        let p: Period = "2025-12".parse().unwrap();
        assert_eq!(p.start().to_rfc3339(), "2025-12-01T00:00:00+00:00");
        assert_eq!(p.end().to_rfc3339(), "2026-01-01T00:00:00+00:00");
        assert_eq!(p.year_start().to_rfc3339(), "2025-01-01T00:00:00+00:00");
        assert_eq!(p.previous().to_string(), "2025-11");
        assert_eq!("2025-01".parse::<Period>().unwrap().previous().to_string(), "2024-12");
        assert_eq!(p.long_name(), "December 2025");
    }

    #[test]
    fn test_has_entry_for_period() {
        let march = Utc.with_ymd_and_hms(2025, 3, 14, 10, 0, 0).unwrap();
        let entries = vec![entry_model(1, "Inventory accuracy", 97.0, Some(false), march)];

        let found = has_entry_for_period(&entries, "Inventory accuracy", &"2025-03".parse().unwrap());
        assert_eq!(found.map(|e| e.id), Some(1));

        let april = has_entry_for_period(&entries, "Inventory accuracy", &"2025-04".parse().unwrap());
        assert!(april.is_none());

        let other = has_entry_for_period(&entries, "Audits performed", &"2025-03".parse().unwrap());
        assert!(other.is_none());
    }
}
