use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::models::schedule::{MinuteWindow, WorkingSchedule};
use crate::models::scheduler::SchedulerDefaults;
use crate::services::schedule_utils;

/// Everything the settings layer persists for one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulingProfile {
    pub working_schedule: WorkingSchedule,
    pub defaults: SchedulerDefaults,
}

/// Human-edited profile document. Times are `"HH:MM"`.
///
/// ```yaml
/// workingHours:
///   start: "09:00"
///   end: "17:00"
///   lunch: { start: "12:00", end: "13:00" }
///   workingDays: [Mon, Tue, Wed, Thu, Fri]
///   timezone: Europe/Berlin
/// defaults:
///   intensityMode: intense
///   strictDeadlines: true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileDocument {
    pub working_hours: Option<WorkingHoursDocument>,
    pub defaults: Option<SchedulerDefaults>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkingHoursDocument {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub lunch: Option<TimeRangeDocument>,
    #[serde(default)]
    pub working_days: Option<Vec<Weekday>>,
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeRangeDocument {
    pub start: String,
    pub end: String,
}

impl WorkingHoursDocument {
    pub fn into_schedule(self) -> AppResult<WorkingSchedule> {
        let mut schedule = WorkingSchedule::from_hours(&self.start, &self.end)?;
        if let Some(lunch) = self.lunch {
            schedule = schedule.with_lunch(MinuteWindow::from_hours(&lunch.start, &lunch.end)?);
        }
        if let Some(days) = self.working_days {
            schedule = schedule.with_working_days(days);
        }
        schedule = schedule.with_holidays(self.holidays);
        schedule.timezone = self.timezone;
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn from_schedule(schedule: &WorkingSchedule) -> Self {
        Self {
            start: schedule_utils::format_time_of_day(schedule.start_minute),
            end: schedule_utils::format_time_of_day(schedule.end_minute),
            lunch: schedule.lunch_break.map(|lunch| TimeRangeDocument {
                start: schedule_utils::format_time_of_day(lunch.start_minute),
                end: schedule_utils::format_time_of_day(lunch.end_minute),
            }),
            working_days: Some(schedule.working_days.clone()),
            holidays: schedule.holidays.clone(),
            timezone: schedule.timezone.clone(),
        }
    }
}
