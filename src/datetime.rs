//! Date/time utilities for newsrelay.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

/// Current time as fractional unix epoch seconds.
pub fn unix_now() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

/// Today's date in the given timezone.
pub fn today_in(tz: &Tz) -> NaiveDate {
    Utc::now().with_timezone(tz).date_naive()
}

/// Format a date the way the feed writes it in daily headings: `YYYY/M/D`,
/// month and day without zero padding.
pub fn heading_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.year(), date.month(), date.day())
}

/// Format a DateTime<Utc> in the given timezone.
pub fn format_in_tz(dt: &DateTime<Utc>, tz: &Tz, format: &str) -> String {
    dt.with_timezone(tz).format(format).to_string()
}

/// Compute the next scheduled run strictly after `now`.
///
/// Runs happen at `at` local time on the listed weekdays. Local times that do
/// not exist (DST gaps) are skipped. Returns `None` when no weekday is listed.
pub fn next_run_after(
    now: DateTime<Utc>,
    tz: &Tz,
    at: NaiveTime,
    weekdays: &[Weekday],
) -> Option<DateTime<Utc>> {
    if weekdays.is_empty() {
        return None;
    }

    let local_today = now.with_timezone(tz).date_naive();
    // A week plus one day covers every weekday and DST gap.
    for offset in 0..=8u64 {
        let date = local_today.checked_add_days(Days::new(offset))?;
        if !weekdays.contains(&date.weekday()) {
            continue;
        }
        let Some(local) = tz.from_local_datetime(&date.and_time(at)).earliest() else {
            continue;
        };
        let candidate = local.with_timezone(&Utc);
        if candidate > now {
            return Some(candidate);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEEKDAYS: [Weekday; 5] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ];

    fn ten() -> NaiveTime {
        NaiveTime::from_hms_opt(10, 0, 0).unwrap()
    }

    #[test]
    fn test_heading_date_not_padded() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 5).unwrap();
        assert_eq!(heading_date(date), "2025/6/5");

        let date = NaiveDate::from_ymd_opt(2025, 12, 25).unwrap();
        assert_eq!(heading_date(date), "2025/12/25");
    }

    #[test]
    fn test_format_in_tz() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let result = format_in_tz(&dt, &chrono_tz::Asia::Shanghai, "%Y-%m-%d %H:%M:%S");
        assert_eq!(result, "2024-01-15 18:30:00"); // UTC+8
    }

    #[test]
    fn test_unix_now_is_recent() {
        let now = unix_now();
        let secs = Utc::now().timestamp() as f64;
        assert!((now - secs).abs() < 2.0);
    }

    #[test]
    fn test_next_run_later_same_day() {
        // Wednesday 2025-06-25 01:00 UTC = 09:00 in Shanghai
        let now = Utc.with_ymd_and_hms(2025, 6, 25, 1, 0, 0).unwrap();
        let next = next_run_after(now, &chrono_tz::Asia::Shanghai, ten(), &WEEKDAYS).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 6, 25, 2, 0, 0).unwrap());
    }

    #[test]
    fn test_next_run_after_time_passed() {
        // Wednesday 10:00 exactly in Shanghai: the run is due tomorrow
        let now = Utc.with_ymd_and_hms(2025, 6, 25, 2, 0, 0).unwrap();
        let next = next_run_after(now, &chrono_tz::Asia::Shanghai, ten(), &WEEKDAYS).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 6, 26, 2, 0, 0).unwrap());
    }

    #[test]
    fn test_next_run_skips_weekend() {
        // Friday 2025-06-27 12:00 in Shanghai
        let now = Utc.with_ymd_and_hms(2025, 6, 27, 4, 0, 0).unwrap();
        let next = next_run_after(now, &chrono_tz::Asia::Shanghai, ten(), &WEEKDAYS).unwrap();
        // Monday 2025-06-30
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 6, 30, 2, 0, 0).unwrap());
    }

    #[test]
    fn test_next_run_local_date_differs_from_utc() {
        // Sunday 2025-06-29 20:00 UTC is already Monday 04:00 in Shanghai
        let now = Utc.with_ymd_and_hms(2025, 6, 29, 20, 0, 0).unwrap();
        let next = next_run_after(now, &chrono_tz::Asia::Shanghai, ten(), &WEEKDAYS).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 6, 30, 2, 0, 0).unwrap());
    }

    #[test]
    fn test_next_run_no_weekdays() {
        let now = Utc.with_ymd_and_hms(2025, 6, 25, 1, 0, 0).unwrap();
        assert!(next_run_after(now, &chrono_tz::UTC, ten(), &[]).is_none());
    }
}
