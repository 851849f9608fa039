use chrono::{DateTime, Duration, Utc};

/// Whole calendar days from `from` to `to` (both truncated to midnight UTC).
pub fn calendar_days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to.date_naive() - from.date_naive()).num_days()
}

/// Days since the due date; zero or negative when not yet overdue.
pub fn days_overdue(due_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    calendar_days_between(due_date, now)
}

/// Overdue once a full 24 hours have elapsed since the due date.
pub fn is_overdue(due_date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - due_date >= Duration::days(1)
}

pub fn is_due_in_exactly(due_date: DateTime<Utc>, now: DateTime<Utc>, days: i64) -> bool {
    calendar_days_between(now, due_date) == days
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_due_yesterday_is_overdue() {
        let now = noon();
        assert!(is_overdue(now - Duration::days(1), now));
        assert_eq!(days_overdue(now - Duration::days(1), now), 1);
    }

    #[test]
    fn test_due_today_is_not_overdue() {
        let now = noon();
        let this_morning = Utc.with_ymd_and_hms(2025, 10, 15, 0, 0, 0).unwrap();
        assert!(!is_overdue(this_morning, now));
        assert!(!is_overdue(now + Duration::hours(3), now));
    }

    #[test]
    fn test_late_evening_due_date_not_overdue_after_midnight() {
        let due = Utc.with_ymd_and_hms(2025, 10, 14, 23, 0, 0).unwrap();
        let just_after_midnight = Utc.with_ymd_and_hms(2025, 10, 15, 1, 0, 0).unwrap();
        assert!(!is_overdue(due, just_after_midnight));
        assert!(!is_overdue(due, due + Duration::hours(23)));
        assert!(is_overdue(due, due + Duration::hours(24)));
    }

    #[test]
    fn test_due_in_exactly_ignores_time_of_day() {
        let now = noon();
        let due = Utc.with_ymd_and_hms(2025, 10, 18, 1, 30, 0).unwrap();
        assert!(is_due_in_exactly(due, now, 3));
        assert!(!is_due_in_exactly(due, now, 2));
    }
}
