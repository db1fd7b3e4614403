//! Daily run schedule for daemon mode

use chrono::{DateTime, Days, Duration, NaiveTime, TimeZone};

/// Parses a time of day written as `HH:MM`
pub fn parse_daily_at(raw: &str) -> Option<NaiveTime> {
    let (hours, minutes) = raw.trim().split_once(':')?;
    if hours.len() != 2 || minutes.len() != 2 {
        return None;
    }
    NaiveTime::from_hms_opt(hours.parse().ok()?, minutes.parse().ok()?, 0)
}

/// First occurrence of `at` (local to `now`'s time zone) strictly after `now`
///
/// A time skipped by a daylight-saving jump moves on to the next day.
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = now.date_naive();

    for offset in 0..=2 {
        let Some(date) = today.checked_add_days(Days::new(offset)) else {
            break;
        };
        if let Some(run) = tz.from_local_datetime(&date.and_time(at)).earliest() {
            if run > *now {
                return run;
            }
        }
    }

    now.clone() + Duration::days(1)
}

/// Time to wait from `now` until the next run
pub fn wait_until_next<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> std::time::Duration {
    (next_run_after(now, at) - now.clone())
        .to_std()
        .unwrap_or_default()
}
