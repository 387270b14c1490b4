// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and the UTC day-key.
//!
//! The spin cooldown and its user-facing countdown both derive from the
//! same UTC boundary, so every user shares one daily reset regardless of
//! local time.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Stable, sortable calendar-day identifier in UTC ("YYYY-MM-DD").
///
/// Used to namespace once-per-day actions; no state, no local time.
pub fn day_key(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d").to_string()
}

/// Start of the next UTC day after `instant` (the spin reset boundary).
pub fn next_utc_day_start(instant: DateTime<Utc>) -> DateTime<Utc> {
    let next_day = instant.date_naive() + Duration::days(1);
    next_day
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_day_key_is_utc_calendar_date() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 15, 23, 59, 59).unwrap();
        assert_eq!(day_key(instant), "2024-03-15");

        let just_after_midnight = Utc.with_ymd_and_hms(2024, 3, 16, 0, 0, 1).unwrap();
        assert_eq!(day_key(just_after_midnight), "2024-03-16");
    }

    #[test]
    fn test_day_key_is_sortable() {
        let a = day_key(Utc.with_ymd_and_hms(2024, 9, 30, 12, 0, 0).unwrap());
        let b = day_key(Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap());
        assert!(a < b);
    }

    #[test]
    fn test_next_utc_day_start() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 15, 18, 30, 0).unwrap();
        let reset = next_utc_day_start(instant);
        assert_eq!(format_utc_rfc3339(reset), "2024-03-16T00:00:00Z");
    }

    #[test]
    fn test_next_utc_day_start_crosses_month_boundary() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 31, 5, 0, 0).unwrap();
        let reset = next_utc_day_start(instant);
        assert_eq!(format_utc_rfc3339(reset), "2024-02-01T00:00:00Z");
    }
}
