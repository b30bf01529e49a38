use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::models::capacity::{
    BufferRecommendation, CapacityDisplay, CapacityStatus, DayCapacity, ScheduleGap,
    ScheduleGaps, WeeklyCapacitySummary,
};
use crate::models::schedule::WorkingSchedule;
use crate::models::task::Task;
use crate::services::capacity_service;

pub const DEFAULT_GAP_HORIZON_DAYS: i64 = 14;
pub const MIN_GAP_MINUTES: i64 = 30;
pub const MIN_BUFFER_SAMPLES: usize = 5;
pub const DEFAULT_BUFFER_PERCENT: u32 = 25;

/// Upper bound (inclusive) of each utilization bucket, in order.
const DISPLAY_TABLE: [(f64, CapacityDisplay); 5] = [
    (
        0.0,
        CapacityDisplay {
            color: "green",
            label: "Available",
            icon: "🟢",
        },
    ),
    (
        70.0,
        CapacityDisplay {
            color: "blue",
            label: "Comfortable",
            icon: "🔵",
        },
    ),
    (
        90.0,
        CapacityDisplay {
            color: "yellow",
            label: "Busy",
            icon: "🟡",
        },
    ),
    (
        100.0,
        CapacityDisplay {
            color: "orange",
            label: "Full",
            icon: "🟠",
        },
    ),
    (
        f64::INFINITY,
        CapacityDisplay {
            color: "red",
            label: "Overbooked",
            icon: "🔴",
        },
    ),
];

/// Overrun bands: mean overrun strictly below the bound maps to the buffer.
const BUFFER_BANDS: [(f64, u32); 3] = [(0.0, 10), (10.0, 15), (25.0, 25)];
const MAX_BUFFER_PERCENT: u32 = 35;

pub fn capacity_display(utilization: f64) -> CapacityDisplay {
    DISPLAY_TABLE
        .iter()
        .find(|(upper, _)| utilization <= *upper)
        .map(|(_, display)| *display)
        .unwrap_or(DISPLAY_TABLE[DISPLAY_TABLE.len() - 1].1)
}

pub fn status_display(status: CapacityStatus) -> CapacityDisplay {
    let index = match status {
        CapacityStatus::Available => 0,
        CapacityStatus::Comfortable => 1,
        CapacityStatus::Busy => 2,
        CapacityStatus::Full => 3,
        CapacityStatus::Overbooked => 4,
    };
    DISPLAY_TABLE[index].1
}

/// Rolls seven (or any number of) days up into one summary. Average
/// utilization covers working days only.
pub fn summarize_week(week_start: NaiveDate, days: Vec<DayCapacity>) -> WeeklyCapacitySummary {
    let total_available_minutes = days.iter().map(|day| day.available_minutes).sum::<i64>();
    let total_scheduled_minutes = days
        .iter()
        .map(|day| day.total_minutes_scheduled)
        .sum::<i64>();

    let working = days
        .iter()
        .filter(|day| day.is_working_day())
        .collect::<Vec<_>>();
    let average_utilization = if working.is_empty() {
        0.0
    } else {
        working
            .iter()
            .map(|day| day.utilization_percentage)
            .sum::<f64>()
            / working.len() as f64
    };

    // First maximum / first minimum wins on ties.
    let mut busiest: Option<&DayCapacity> = None;
    let mut lightest: Option<&DayCapacity> = None;
    for day in working.iter().copied() {
        if busiest.map_or(true, |best| day.utilization_percentage > best.utilization_percentage) {
            busiest = Some(day);
        }
        if lightest.map_or(true, |best| day.utilization_percentage < best.utilization_percentage) {
            lightest = Some(day);
        }
    }

    let overbooked_days = days
        .iter()
        .filter(|day| day.status == CapacityStatus::Overbooked)
        .count();
    let status = CapacityStatus::from_utilization(capacity_service::utilization_percentage(
        total_scheduled_minutes,
        total_available_minutes,
    ));

    WeeklyCapacitySummary {
        week_start,
        busiest_day: busiest.map(|day| day.date),
        lightest_day: lightest.map(|day| day.date),
        days,
        total_available_minutes,
        total_scheduled_minutes,
        average_utilization,
        overbooked_days,
        status,
    }
}

pub fn weekly_summary(
    week_start: NaiveDate,
    tasks: &[Task],
    schedule: &WorkingSchedule,
    holidays: &[NaiveDate],
) -> WeeklyCapacitySummary {
    summarize_week(
        week_start,
        capacity_service::calculate_week_capacity(week_start, tasks, schedule, holidays),
    )
}

/// Working days from `start` within `horizon_days` that still have at
/// least [`MIN_GAP_MINUTES`] free.
pub fn find_schedule_gaps(
    start: NaiveDate,
    tasks: &[Task],
    schedule: &WorkingSchedule,
    holidays: &[NaiveDate],
    horizon_days: Option<i64>,
) -> ScheduleGaps {
    let horizon = horizon_days.unwrap_or(DEFAULT_GAP_HORIZON_DAYS).max(0);
    let gaps = (0..horizon)
        .map(|offset| start + Duration::days(offset))
        .map(|date| capacity_service::calculate_day_capacity(date, tasks, schedule, holidays))
        .filter(|day| day.is_working_day())
        .filter(|day| day.free_minutes() >= MIN_GAP_MINUTES)
        .map(|day| ScheduleGap {
            date: day.date,
            free_minutes: day.free_minutes(),
            available_minutes: day.available_minutes,
            utilization_percentage: day.utilization_percentage,
        })
        .collect::<Vec<_>>();

    debug!(target: "app::capacity", %start, horizon, gaps = gaps.len(), "schedule gaps scanned");
    ScheduleGaps { gaps }
}

/// Suggests how much padding to add to estimates, from how far completed
/// tasks overran them.
pub fn calculate_buffer_recommendation(tasks: &[Task]) -> BufferRecommendation {
    let overruns = tasks
        .iter()
        .filter(|task| task.is_completed() && task.estimated_minutes > 0)
        .filter_map(|task| {
            task.actual_minutes.map(|actual| {
                (actual - task.estimated_minutes) as f64 / task.estimated_minutes as f64 * 100.0
            })
        })
        .collect::<Vec<_>>();

    if overruns.len() < MIN_BUFFER_SAMPLES {
        return BufferRecommendation {
            recommended_buffer_percent: DEFAULT_BUFFER_PERCENT,
            average_overrun_percent: None,
            sample_size: overruns.len(),
            reason: format!(
                "only {} completed task(s) with actual time; using the default buffer",
                overruns.len()
            ),
        };
    }

    let mean = overruns.iter().sum::<f64>() / overruns.len() as f64;
    let recommended = BUFFER_BANDS
        .iter()
        .find(|(upper, _)| mean < *upper)
        .map(|(_, buffer)| *buffer)
        .unwrap_or(MAX_BUFFER_PERCENT);

    let reason = if mean < 0.0 {
        format!("tasks finish {:.0}% under estimate on average", -mean)
    } else {
        format!("tasks overrun estimates by {mean:.0}% on average")
    };

    BufferRecommendation {
        recommended_buffer_percent: recommended,
        average_overrun_percent: Some(mean),
        sample_size: overruns.len(),
        reason,
    }
}
