use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::models::capacity::{CapacityStatus, DayCapacity};
use crate::models::schedule::{MinuteWindow, TimeInterval, WorkingSchedule};
use crate::models::task::Task;
use crate::services::schedule_utils;

/// Working minutes on `date`: zero on non-working days and holidays,
/// otherwise the working span minus whatever part of `lunch` falls inside it.
pub fn available_minutes(
    date: NaiveDate,
    schedule: &WorkingSchedule,
    lunch: Option<&MinuteWindow>,
    holidays: &[NaiveDate],
) -> i64 {
    if !schedule.is_working_day(date) || is_holiday(date, schedule, holidays) {
        return 0;
    }
    let window = schedule.window();
    let lunch_minutes = lunch
        .map(|lunch| window.overlap_minutes(lunch))
        .unwrap_or(0);
    (window.minutes() - lunch_minutes).max(0)
}

pub fn calculate_day_capacity(
    date: NaiveDate,
    tasks: &[Task],
    schedule: &WorkingSchedule,
    holidays: &[NaiveDate],
) -> DayCapacity {
    calculate_day_capacity_with_blocks(date, tasks, &[], schedule, holidays)
}

/// Same as [`calculate_day_capacity`], additionally counting habit and
/// calendar blocks that overlap `date`.
pub fn calculate_day_capacity_with_blocks(
    date: NaiveDate,
    tasks: &[Task],
    blocks: &[TimeInterval],
    schedule: &WorkingSchedule,
    holidays: &[NaiveDate],
) -> DayCapacity {
    let is_weekend = !schedule.is_working_day(date);
    let is_holiday = is_holiday(date, schedule, holidays);
    let available = available_minutes(date, schedule, schedule.lunch_break.as_ref(), holidays);

    let day_tasks = tasks
        .iter()
        .filter(|task| task.scheduled_on(date))
        .collect::<Vec<_>>();
    let task_minutes: i64 = day_tasks.iter().map(|task| task.placed_minutes()).sum();

    let whole_day = TimeInterval::new(
        schedule_utils::at_minute(date, 0),
        schedule_utils::at_minute(date, 24 * 60),
    );
    let block_minutes: i64 = blocks
        .iter()
        .map(|block| block.overlap_minutes(&whole_day))
        .sum();

    let scheduled = task_minutes + block_minutes;
    let utilization = utilization_percentage(scheduled, available);
    let status = CapacityStatus::from_utilization(utilization);

    debug!(
        target: "app::capacity",
        date = %date,
        available,
        scheduled,
        utilization,
        status = %status,
        "day capacity computed"
    );

    DayCapacity {
        date,
        available_minutes: available,
        total_minutes_scheduled: scheduled,
        utilization_percentage: utilization,
        status,
        is_weekend,
        is_holiday,
        task_count: day_tasks.len(),
    }
}

pub fn calculate_week_capacity(
    week_start: NaiveDate,
    tasks: &[Task],
    schedule: &WorkingSchedule,
    holidays: &[NaiveDate],
) -> Vec<DayCapacity> {
    (0..7)
        .map(|offset| {
            calculate_day_capacity(
                week_start + Duration::days(offset),
                tasks,
                schedule,
                holidays,
            )
        })
        .collect()
}

/// `scheduled / available × 100`. A day without availability reads 0 when
/// empty; anything booked on it is measured against a single minute so the
/// day always lands in the overbooked bucket.
pub fn utilization_percentage(scheduled: i64, available: i64) -> f64 {
    if scheduled <= 0 {
        return 0.0;
    }
    scheduled as f64 / available.max(1) as f64 * 100.0
}

fn is_holiday(date: NaiveDate, schedule: &WorkingSchedule, holidays: &[NaiveDate]) -> bool {
    holidays.contains(&date) || schedule.is_holiday(date)
}
