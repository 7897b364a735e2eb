use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};

/// Business window: Monday-Friday, 09:00-17:00. No holiday awareness.
const OPENING_HOUR: u32 = 9;
const CLOSING_HOUR: u32 = 17;

/// Advances `start` by `minutes` of business time.
///
/// The position is normalized before any consumption: a weekend start jumps
/// to the next Monday 09:00, a start before 09:00 clamps to 09:00 and a
/// start at or after 17:00 rolls to the next business day. Minutes that do
/// not fit in the current day's remaining window spill into the following
/// business day, skipping weekends. Consumption is seconds-exact, so a start
/// with a sub-minute component carries it through.
pub fn advance(start: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    let mut current = start;
    let mut remaining_secs = minutes.max(0) * 60;

    loop {
        // Saturday or Sunday: jump to the coming Monday's opening.
        let weekday = current.weekday().num_days_from_monday();
        if weekday >= 5 {
            let days_ahead = i64::from(7 - weekday);
            current = opening(current.date_naive()) + Duration::days(days_ahead);
            continue;
        }

        let day_open = opening(current.date_naive());
        let day_close = closing(current.date_naive());

        if current < day_open {
            current = day_open;
        }
        if current >= day_close {
            current = opening(current.date_naive()) + Duration::days(1);
            continue;
        }

        if remaining_secs == 0 {
            return current;
        }

        let left_today = (day_close - current).num_seconds();
        if remaining_secs <= left_today {
            return current + Duration::seconds(remaining_secs);
        }

        remaining_secs -= left_today;
        current = opening(current.date_naive()) + Duration::days(1);
    }
}

fn opening(day: NaiveDate) -> DateTime<Utc> {
    at_hour(day, OPENING_HOUR)
}

fn closing(day: NaiveDate) -> DateTime<Utc> {
    at_hour(day, CLOSING_HOUR)
}

fn at_hour(day: NaiveDate, hour: u32) -> DateTime<Utc> {
    // hour is one of the window constants, always a valid wall-clock time
    day.and_hms_opt(hour, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or_else(|| Utc.from_utc_datetime(&day.and_time(Default::default())))
}
