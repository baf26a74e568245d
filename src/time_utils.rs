// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, Days, NaiveDate, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current time, RFC3339 with `Z`.
pub fn now_rfc3339() -> String {
    format_utc_rfc3339(Utc::now())
}

/// `days` calendar days before `date`, saturating at the earliest date.
pub fn days_before(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_uses_z_suffix() {
        let t = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_utc_rfc3339(t), "2025-01-02T03:04:05Z");
    }

    #[test]
    fn test_days_before_crosses_month() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(days_before(d, 30), NaiveDate::from_ymd_opt(2025, 1, 30).unwrap());
        assert_eq!(days_before(d, 0), d);
    }
}
