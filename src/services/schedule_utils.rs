use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use serde_json::json;

use crate::error::{AppError, AppResult};

pub fn parse_time_of_day(value: &str) -> AppResult<u32> {
    let time = NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|err| {
        AppError::validation_with_details(
            "invalid time of day, expected HH:MM",
            json!({"value": value, "error": err.to_string()}),
        )
    })?;
    Ok(minutes_from_midnight(time))
}

pub fn format_time_of_day(total_minutes: u32) -> String {
    format!("{:02}:{:02}", total_minutes / 60, total_minutes % 60)
}

pub fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|err| {
        AppError::validation_with_details(
            "invalid date, expected YYYY-MM-DD",
            json!({"value": value, "error": err.to_string()}),
        )
    })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn minutes_from_midnight(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

pub fn midnight_minutes_of(dt: NaiveDateTime) -> u32 {
    minutes_from_midnight(dt.time())
}

/// Wall-clock instant `minute` minutes after midnight of `date`. 1440
/// lands on the following midnight.
pub fn at_minute(date: NaiveDate, minute: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::minutes(minute as i64)
}

pub fn add_minutes(dt: NaiveDateTime, minutes: i64) -> AppResult<NaiveDateTime> {
    dt.checked_add_signed(Duration::minutes(minutes))
        .ok_or_else(|| AppError::validation("time arithmetic out of range"))
}

pub fn clamp_time_to_window(current: NaiveDateTime, window_start: NaiveDateTime) -> NaiveDateTime {
    if current < window_start {
        window_start
    } else {
        current
    }
}

/// Every date from `start` to `end` inclusive; empty when `end < start`.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let days = (end - start).num_days();
    (0..=days.max(-1)).map(move |offset| start + Duration::days(offset))
}

pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

pub fn parse_timezone(name: &str) -> AppResult<Tz> {
    name.parse::<Tz>()
        .map_err(|err| AppError::validation(format!("unknown timezone {name}: {err}")))
}

/// Current wall-clock time in `timezone`, or UTC when none is configured.
pub fn local_now(timezone: Option<&str>) -> AppResult<NaiveDateTime> {
    let now = Utc::now();
    match timezone {
        Some(name) => Ok(now.with_timezone(&parse_timezone(name)?).naive_local()),
        None => Ok(now.naive_utc()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_format_time_of_day() {
        assert_eq!(parse_time_of_day("09:30").expect("parse"), 570);
        assert_eq!(format_time_of_day(570), "09:30");
        assert!(parse_time_of_day("9am").is_err());
    }

    #[test]
    fn date_range_is_inclusive_and_empty_when_reversed() {
        let start = parse_date("2025-03-03").expect("start");
        let end = parse_date("2025-03-05").expect("end");
        assert_eq!(date_range(start, end).count(), 3);
        assert_eq!(date_range(end, start).count(), 0);
        assert_eq!(date_range(start, start).count(), 1);
    }

    #[test]
    fn at_minute_handles_end_of_day() {
        let day = parse_date("2025-03-03").expect("day");
        let midnight = at_minute(day, 24 * 60);
        assert_eq!(midnight.date(), day.succ_opt().expect("next"));
        assert_eq!(midnight_minutes_of(at_minute(day, 615)), 615);
    }

    #[test]
    fn local_now_rejects_unknown_zone() {
        assert!(local_now(Some("Europe/Berlin")).is_ok());
        assert!(local_now(Some("Mars/Olympus")).is_err());
    }
}
