//! Schedule evaluation for scheduled reports. All times are UTC.

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, Utc};

use assetdesk_entity::report::{Frequency, Schedule, ScheduleDay};

/// Days searched ahead by [`next_run`].
pub const NEXT_RUN_HORIZON_DAYS: u64 = 400;

/// Whether a report with `schedule`, last claimed at `last_run_at`, is due at `now`.
pub fn is_due(
    schedule: &Schedule,
    last_run_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    let (Some(frequency), Some(time)) = (schedule.frequency, schedule.time) else {
        return false;
    };

    let today = now.date_naive();
    if today.and_time(time).and_utc() > now {
        return false;
    }
    let last = last_run_at.map(|t| t.date_naive());

    match (frequency, schedule.day) {
        (Frequency::Daily, _) => last.is_none_or(|last| last < today),
        (Frequency::Weekly, Some(ScheduleDay::Weekday(weekday))) => {
            today.weekday() == weekday
                && last.is_none_or(|last| week_start(last) < week_start(today))
        }
        (Frequency::Monthly, Some(ScheduleDay::DayOfMonth(day))) => {
            let last_day = days_in_month(today);
            let matches_day = today.day() == day || (day > last_day && today.day() == last_day);
            matches_day && last.is_none_or(|last| month_start(last) < month_start(today))
        }
        _ => false,
    }
}

/// Estimate the next instant at which the report becomes due.
///
/// Returns `now` if already due, otherwise the first scheduled slot within
/// [`NEXT_RUN_HORIZON_DAYS`] that [`is_due`] accepts. `None` when the
/// schedule never fires.
pub fn next_run(
    schedule: &Schedule,
    last_run_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let (Some(_), Some(time)) = (schedule.frequency, schedule.time) else {
        return None;
    };

    if is_due(schedule, last_run_at, now) {
        return Some(now);
    }

    let today = now.date_naive();
    (0..=NEXT_RUN_HORIZON_DAYS)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .map(|date| date.and_time(time).and_utc())
        .filter(|slot| *slot > now)
        .find(|slot| is_due(schedule, last_run_at, *slot))
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn days_in_month(date: NaiveDate) -> u32 {
    let first = month_start(date);
    first
        .checked_add_months(chrono::Months::new(1))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone, Weekday};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn schedule(frequency: Frequency, day: Option<ScheduleDay>, h: u32, m: u32) -> Schedule {
        Schedule {
            frequency: Some(frequency),
            day,
            time: NaiveTime::from_hms_opt(h, m, 0),
        }
    }

    #[test]
    fn test_daily_due_after_time_when_not_run_today() {
        let s = schedule(Frequency::Daily, None, 6, 0);
        let now = at(2024, 5, 14, 6, 30);
        assert!(is_due(&s, None, now));
        assert!(is_due(&s, Some(at(2024, 5, 13, 6, 0)), now));
        assert!(!is_due(&s, Some(at(2024, 5, 14, 6, 1)), now));
        assert!(!is_due(&s, None, at(2024, 5, 14, 5, 59)));
    }

    #[test]
    fn test_weekly_monday_nine() {
        let s = schedule(Frequency::Weekly, Some(ScheduleDay::Weekday(Weekday::Mon)), 9, 0);
        // 2024-05-13 is a Monday.
        assert!(is_due(&s, None, at(2024, 5, 13, 9, 1)));
        assert!(!is_due(&s, None, at(2024, 5, 13, 8, 59)));
        assert!(!is_due(&s, None, at(2024, 5, 14, 9, 1)));
        assert!(!is_due(&s, Some(at(2024, 5, 13, 9, 0)), at(2024, 5, 13, 15, 0)));
        assert!(is_due(&s, Some(at(2024, 5, 6, 9, 0)), at(2024, 5, 13, 9, 1)));
    }

    #[test]
    fn test_monthly_31_rolls_to_last_day() {
        let s = schedule(Frequency::Monthly, Some(ScheduleDay::DayOfMonth(31)), 0, 0);
        assert!(is_due(&s, None, at(2024, 4, 30, 1, 0)));
        assert!(!is_due(&s, None, at(2024, 4, 29, 1, 0)));
        assert!(is_due(&s, None, at(2024, 2, 29, 1, 0)));
        assert!(is_due(&s, None, at(2023, 2, 28, 1, 0)));
        assert!(is_due(&s, None, at(2024, 5, 31, 1, 0)));
        assert!(!is_due(&s, None, at(2024, 5, 30, 1, 0)));
    }

    #[test]
    fn test_monthly_runs_once_per_month() {
        let s = schedule(Frequency::Monthly, Some(ScheduleDay::DayOfMonth(15)), 8, 0);
        let now = at(2024, 6, 15, 9, 0);
        assert!(is_due(&s, Some(at(2024, 5, 15, 8, 0)), now));
        assert!(!is_due(&s, Some(at(2024, 6, 1, 0, 0)), now));
    }

    #[test]
    fn test_incomplete_schedule_never_due() {
        let no_time = Schedule {
            frequency: Some(Frequency::Daily),
            day: None,
            time: None,
        };
        assert!(!is_due(&no_time, None, at(2024, 1, 1, 12, 0)));
        let weekly_without_day = schedule(Frequency::Weekly, None, 0, 0);
        assert!(!is_due(&weekly_without_day, None, at(2024, 1, 1, 12, 0)));
        let mismatched = schedule(Frequency::Monthly, Some(ScheduleDay::Weekday(Weekday::Fri)), 0, 0);
        assert!(!is_due(&mismatched, None, at(2024, 1, 5, 12, 0)));
        assert_eq!(next_run(&mismatched, None, at(2024, 1, 5, 12, 0)), None);
    }

    #[test]
    fn test_next_run() {
        let weekly = schedule(Frequency::Weekly, Some(ScheduleDay::Weekday(Weekday::Mon)), 9, 0);
        let tuesday = at(2024, 5, 14, 10, 0);
        assert_eq!(
            next_run(&weekly, Some(at(2024, 5, 13, 9, 0)), tuesday),
            Some(at(2024, 5, 20, 9, 0))
        );

        let daily = schedule(Frequency::Daily, None, 6, 0);
        let now = at(2024, 5, 14, 7, 0);
        assert_eq!(next_run(&daily, None, now), Some(now));
        assert_eq!(
            next_run(&daily, Some(at(2024, 5, 14, 6, 0)), now),
            Some(at(2024, 5, 15, 6, 0))
        );
    }
}
