use std::time::Duration;

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};

/// Short `M/d` form used for the since/until labels.
pub fn short_date(date: NaiveDate) -> String {
    date.format("%-m/%-d").to_string()
}

/// Returns start of the next day.
pub fn next_day_start(date: NaiveDateTime) -> NaiveDateTime {
    date.date()
        .checked_add_days(Days::new(1))
        .map(|d| d.and_time(NaiveTime::MIN))
        .unwrap_or(date)
}

/// Time left until the next local midnight. Never negative.
pub fn until_next_day(now: NaiveDateTime) -> Duration {
    (next_day_start(now) - now).to_std().unwrap_or(Duration::ZERO)
}

/// Whole days from `from` to `to`, negative when `to` is earlier.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    to.signed_duration_since(from).num_days()
}

/// Shifts a date by a signed amount of days. Returns `None` outside of the representable range.
pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    if days >= 0 {
        date.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::NaiveDate;

    use crate::utils::{
        clock::test_clock::{at, day},
        time::{add_days, days_between, next_day_start, short_date, until_next_day},
    };

    #[test]
    fn next_day_start_crosses_month() {
        assert_eq!(
            next_day_start(at(day(2025, 3, 31), 17, 45)),
            at(day(2025, 4, 1), 0, 0)
        );
    }

    #[test]
    fn until_next_day_at_midnight_is_full_day() {
        assert_eq!(
            until_next_day(at(day(2025, 3, 14), 0, 0)),
            Duration::from_secs(24 * 60 * 60)
        );
        assert_eq!(
            until_next_day(at(day(2025, 3, 14), 23, 30)),
            Duration::from_secs(30 * 60)
        );
    }

    #[test]
    fn days_between_is_signed() {
        assert_eq!(days_between(day(2025, 3, 1), day(2025, 3, 11)), 10);
        assert_eq!(days_between(day(2025, 3, 11), day(2025, 3, 1)), -10);
    }

    #[test]
    fn add_days_handles_overflow() {
        assert_eq!(add_days(day(2025, 3, 1), 29), Some(day(2025, 3, 30)));
        assert_eq!(add_days(day(2025, 3, 1), -1), Some(day(2025, 2, 28)));
        assert_eq!(add_days(NaiveDate::MAX, 1), None);
    }

    #[test]
    fn short_date_has_no_padding() {
        assert_eq!(short_date(day(2025, 3, 4)), "3/4");
    }
}
