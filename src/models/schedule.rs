use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::services::schedule_utils;

pub const DEFAULT_WORKDAY_START: u32 = 9 * 60;
pub const DEFAULT_WORKDAY_END: u32 = 17 * 60;

/// Minutes-from-midnight window within a single day, `[start, end)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MinuteWindow {
    pub start_minute: u32,
    pub end_minute: u32,
}

impl MinuteWindow {
    pub fn new(start_minute: u32, end_minute: u32) -> Self {
        Self {
            start_minute,
            end_minute,
        }
    }

    pub fn from_hours(start: &str, end: &str) -> AppResult<Self> {
        let window = Self::new(
            schedule_utils::parse_time_of_day(start)?,
            schedule_utils::parse_time_of_day(end)?,
        );
        if window.end_minute <= window.start_minute {
            return Err(AppError::validation(format!(
                "window end {end} must be after start {start}"
            )));
        }
        Ok(window)
    }

    pub fn minutes(&self) -> i64 {
        self.end_minute.saturating_sub(self.start_minute) as i64
    }

    /// Overlap length with another window, in minutes.
    pub fn overlap_minutes(&self, other: &MinuteWindow) -> i64 {
        let start = self.start_minute.max(other.start_minute);
        let end = self.end_minute.min(other.end_minute);
        end.saturating_sub(start) as i64
    }

    pub fn on(&self, date: NaiveDate) -> TimeInterval {
        TimeInterval::new(
            schedule_utils::at_minute(date, self.start_minute),
            schedule_utils::at_minute(date, self.end_minute),
        )
    }
}

/// Concrete `[start, end)` range on the user's wall clock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub struct TimeInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeInterval {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    pub fn minutes(&self) -> i64 {
        self.end.signed_duration_since(self.start).num_minutes().max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }

    pub fn overlap_minutes(&self, other: &TimeInterval) -> i64 {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if end > start {
            end.signed_duration_since(start).num_minutes()
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkingSchedule {
    pub start_minute: u32,
    pub end_minute: u32,
    #[serde(default = "default_working_days")]
    pub working_days: Vec<Weekday>,
    #[serde(default)]
    pub lunch_break: Option<MinuteWindow>,
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
    /// IANA zone used to resolve "today" from the wall clock.
    #[serde(default)]
    pub timezone: Option<String>,
}

fn default_working_days() -> Vec<Weekday> {
    vec![
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ]
}

impl Default for WorkingSchedule {
    fn default() -> Self {
        Self {
            start_minute: DEFAULT_WORKDAY_START,
            end_minute: DEFAULT_WORKDAY_END,
            working_days: default_working_days(),
            lunch_break: None,
            holidays: Vec::new(),
            timezone: None,
        }
    }
}

impl WorkingSchedule {
    pub fn from_hours(start: &str, end: &str) -> AppResult<Self> {
        let window = MinuteWindow::from_hours(start, end)?;
        Ok(Self {
            start_minute: window.start_minute,
            end_minute: window.end_minute,
            ..Default::default()
        })
    }

    pub fn with_lunch(mut self, lunch: MinuteWindow) -> Self {
        self.lunch_break = Some(lunch);
        self
    }

    pub fn with_working_days(mut self, days: Vec<Weekday>) -> Self {
        self.working_days = days;
        self
    }

    pub fn with_holidays(mut self, holidays: Vec<NaiveDate>) -> Self {
        self.holidays = holidays;
        self
    }

    pub fn window(&self) -> MinuteWindow {
        MinuteWindow::new(self.start_minute, self.end_minute)
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        self.working_days.contains(&date.weekday())
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.start_minute >= self.end_minute {
            return Err(AppError::validation(
                "working hours invalid: start must be before end",
            ));
        }
        if self.end_minute > 24 * 60 {
            return Err(AppError::validation("working hours must end by 24:00"));
        }
        if self.working_days.is_empty() {
            return Err(AppError::validation("at least one working day is required"));
        }
        if let Some(lunch) = &self.lunch_break {
            if lunch.start_minute >= lunch.end_minute {
                return Err(AppError::validation(
                    "lunch break invalid: start must be before end",
                ));
            }
        }
        if let Some(zone) = &self.timezone {
            schedule_utils::parse_timezone(zone)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HabitBlock {
    pub id: String,
    pub title: String,
    /// Empty means every day.
    #[serde(default)]
    pub days_of_week: Vec<Weekday>,
    #[serde(default)]
    pub start_minute: Option<u32>,
    #[serde(default)]
    pub estimated_minutes: Option<i64>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl HabitBlock {
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        self.active
            && (self.days_of_week.is_empty() || self.days_of_week.contains(&date.weekday()))
    }

    /// The block this habit occupies on `date`, if it has a time and length.
    pub fn interval_on(&self, date: NaiveDate) -> Option<TimeInterval> {
        if !self.applies_on(date) {
            return None;
        }
        let start_minute = self.start_minute?;
        let minutes = self.estimated_minutes.filter(|minutes| *minutes > 0)?;
        let start = schedule_utils::at_minute(date, start_minute);
        Some(TimeInterval::new(
            start,
            start + chrono::Duration::minutes(minutes),
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl CalendarEvent {
    pub fn interval(&self) -> TimeInterval {
        TimeInterval::new(self.start, self.end)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "kind", content = "id")]
pub enum BlockSource {
    Task(String),
    Habit(String),
    Calendar(String),
    Lunch,
}

impl fmt::Display for BlockSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockSource::Task(id) => write!(f, "task {id}"),
            BlockSource::Habit(id) => write!(f, "habit {id}"),
            BlockSource::Calendar(id) => write!(f, "event {id}"),
            BlockSource::Lunch => f.write_str("lunch break"),
        }
    }
}

/// Time the scheduler must not overlap.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockedInterval {
    pub interval: TimeInterval,
    pub source: BlockSource,
}
