use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::schedule::MinuteWindow;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum IntensityMode {
    Relaxed,
    #[default]
    Balanced,
    Intense,
    DeadlineDriven,
}

impl IntensityMode {
    /// Share of a day's available minutes the scheduler may fill.
    pub fn capacity_fraction(&self) -> f64 {
        match self {
            IntensityMode::Relaxed => 0.6,
            IntensityMode::Balanced => 0.75,
            IntensityMode::Intense => 0.9,
            IntensityMode::DeadlineDriven => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntensityMode::Relaxed => "relaxed",
            IntensityMode::Balanced => "balanced",
            IntensityMode::Intense => "intense",
            IntensityMode::DeadlineDriven => "deadline-driven",
        }
    }

    /// Next less aggressive mode, if any.
    pub fn relaxed_step(&self) -> Option<IntensityMode> {
        match self {
            IntensityMode::Relaxed => None,
            IntensityMode::Balanced => Some(IntensityMode::Relaxed),
            IntensityMode::Intense => Some(IntensityMode::Balanced),
            IntensityMode::DeadlineDriven => Some(IntensityMode::Intense),
        }
    }
}

impl fmt::Display for IntensityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PreferredTime {
    Morning,
    Afternoon,
    Evening,
}

impl PreferredTime {
    /// Minute of day from which a relocation search starts.
    pub fn earliest_minute(&self) -> u32 {
        match self {
            PreferredTime::Morning => 0,
            PreferredTime::Afternoon => 12 * 60,
            PreferredTime::Evening => 17 * 60,
        }
    }
}

/// Persisted per-user knobs that seed every `SchedulerConfig`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerDefaults {
    pub intensity_mode: IntensityMode,
    pub strict_deadlines: bool,
    pub deadline_buffer_days: i64,
    pub allow_overtime: bool,
    pub max_overtime_hours: f64,
    pub breaks_between_tasks: i64,
    pub focus_project_ratio: f64,
}

impl Default for SchedulerDefaults {
    fn default() -> Self {
        Self {
            intensity_mode: IntensityMode::Balanced,
            strict_deadlines: false,
            deadline_buffer_days: 2,
            allow_overtime: false,
            max_overtime_hours: 2.0,
            breaks_between_tasks: 0,
            focus_project_ratio: 0.7,
        }
    }
}

impl SchedulerDefaults {
    pub fn validate(&self) -> AppResult<()> {
        if !(0.0..=1.0).contains(&self.focus_project_ratio) {
            return Err(AppError::validation(
                "focus project ratio must be between 0 and 1",
            ));
        }
        if self.deadline_buffer_days < 0 {
            return Err(AppError::validation("deadline buffer days cannot be negative"));
        }
        if self.breaks_between_tasks < 0 {
            return Err(AppError::validation("breaks between tasks cannot be negative"));
        }
        if self.max_overtime_hours < 0.0 || !self.max_overtime_hours.is_finite() {
            return Err(AppError::validation("max overtime hours cannot be negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// The single "today" reference; the scheduler never reads the clock.
    pub today: NaiveDate,
    #[serde(default)]
    pub intensity_mode: IntensityMode,
    #[serde(default)]
    pub strict_deadlines: bool,
    #[serde(default)]
    pub deadline_buffer_days: i64,
    #[serde(default)]
    pub allow_overtime: bool,
    #[serde(default)]
    pub max_overtime_hours: f64,
    #[serde(default)]
    pub breaks_between_tasks: i64,
    #[serde(default)]
    pub lunch_break: Option<MinuteWindow>,
    #[serde(default)]
    pub focus_projects: Vec<String>,
    #[serde(default)]
    pub focus_project_ratio: f64,
    #[serde(default)]
    pub max_minutes_per_day: Option<i64>,
    /// Placed tasks inside the range join the pool instead of blocking.
    #[serde(default)]
    pub reschedule_existing: bool,
    /// In-progress tasks keep their slot even when rescheduling.
    #[serde(default)]
    pub preserve_fixed: bool,
    /// Restricts the pool to these ids when non-empty.
    #[serde(default)]
    pub task_ids: Vec<String>,
}

impl SchedulerConfig {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, today: NaiveDate) -> Self {
        Self::with_defaults(start_date, end_date, today, &SchedulerDefaults::default())
    }

    pub fn with_defaults(
        start_date: NaiveDate,
        end_date: NaiveDate,
        today: NaiveDate,
        defaults: &SchedulerDefaults,
    ) -> Self {
        Self {
            start_date,
            end_date,
            today,
            intensity_mode: defaults.intensity_mode,
            strict_deadlines: defaults.strict_deadlines,
            deadline_buffer_days: defaults.deadline_buffer_days,
            allow_overtime: defaults.allow_overtime,
            max_overtime_hours: defaults.max_overtime_hours,
            breaks_between_tasks: defaults.breaks_between_tasks,
            lunch_break: None,
            focus_projects: Vec::new(),
            focus_project_ratio: defaults.focus_project_ratio,
            max_minutes_per_day: None,
            reschedule_existing: false,
            preserve_fixed: false,
            task_ids: Vec::new(),
        }
    }

    pub fn overtime_minutes(&self) -> i64 {
        if self.allow_overtime {
            (self.max_overtime_hours.max(0.0) * 60.0).round() as i64
        } else {
            0
        }
    }

    /// Last day a task due on `due` may be placed on.
    pub fn last_safe_day(&self, due: NaiveDate) -> NaiveDate {
        due - chrono::Duration::days(self.deadline_buffer_days.max(0))
    }

    pub fn is_focus_project(&self, project_id: Option<&str>) -> bool {
        match project_id {
            Some(id) => self.focus_projects.iter().any(|focus| focus == id),
            None => false,
        }
    }

    pub fn has_valid_range(&self) -> bool {
        self.end_date >= self.start_date
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledSlot {
    pub task_id: String,
    pub task_title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl ScheduledSlot {
    pub fn minutes(&self) -> i64 {
        self.end.signed_duration_since(self.start).num_minutes()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePreview {
    pub date: NaiveDate,
    pub slots: Vec<ScheduledSlot>,
}

impl SchedulePreview {
    pub fn total_minutes(&self) -> i64 {
        self.slots.iter().map(ScheduledSlot::minutes).sum()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    InfeasibleDeadline,
    DeadlineRisk,
    MilestoneRisk,
    CapacityExceeded,
    InvalidTask,
    Overtime,
    NonWorkingDay,
    Unplaced,
    Displaced,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleWarning {
    pub kind: WarningKind,
    #[serde(default)]
    pub task_id: Option<String>,
    pub message: String,
}

impl ScheduleWarning {
    pub fn for_task(kind: WarningKind, task_id: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            task_id: Some(task_id.to_string()),
            message: message.into(),
        }
    }

    pub fn general(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            task_id: None,
            message: message.into(),
        }
    }
}

/// Output of one scheduler run: sparse per-day previews plus everything
/// that could not be satisfied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSchedule {
    pub days: Vec<SchedulePreview>,
    pub warnings: Vec<ScheduleWarning>,
    pub unplaced_task_ids: Vec<String>,
    /// Unplaced tasks that held a slot before the run; applying the preview
    /// clears them so their old time cannot collide with new placements.
    #[serde(default)]
    pub displaced_task_ids: Vec<String>,
}

impl GeneratedSchedule {
    pub fn slot_count(&self) -> usize {
        self.days.iter().map(|day| day.slots.len()).sum()
    }

    pub fn slots(&self) -> impl Iterator<Item = &ScheduledSlot> {
        self.days.iter().flat_map(|day| day.slots.iter())
    }

    pub fn slot_for(&self, task_id: &str) -> Option<&ScheduledSlot> {
        self.slots().find(|slot| slot.task_id == task_id)
    }

    pub fn has_warning_for(&self, task_id: &str, kind: WarningKind) -> bool {
        self.warnings
            .iter()
            .any(|warning| warning.kind == kind && warning.task_id.as_deref() == Some(task_id))
    }
}
