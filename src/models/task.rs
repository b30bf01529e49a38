use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_ESTIMATED_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Blocked,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "blocked" => Ok(TaskStatus::Blocked),
            other => Err(format!("unsupported task status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    /// Higher rank schedules first.
    pub fn rank(&self) -> u8 {
        match self {
            TaskPriority::Low => 0,
            TaskPriority::Medium => 1,
            TaskPriority::High => 2,
            TaskPriority::Urgent => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskPriority {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            "urgent" => Ok(TaskPriority::Urgent),
            other => Err(format!("unsupported task priority: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default = "default_estimated_minutes")]
    pub estimated_minutes: i64,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub scheduled_start: Option<NaiveDateTime>,
    #[serde(default)]
    pub scheduled_end: Option<NaiveDateTime>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub milestone_id: Option<String>,
    /// Informational only; the scheduler does not order by it.
    #[serde(default)]
    pub blocked_by: Vec<String>,
    #[serde(default)]
    pub actual_minutes: Option<i64>,
    #[serde(default)]
    pub completed_at: Option<NaiveDateTime>,
}

fn default_estimated_minutes() -> i64 {
    DEFAULT_ESTIMATED_MINUTES
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
            estimated_minutes: DEFAULT_ESTIMATED_MINUTES,
            due_date: None,
            scheduled_start: None,
            scheduled_end: None,
            project_id: None,
            milestone_id: None,
            blocked_by: Vec::new(),
            actual_minutes: None,
            completed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn is_placed(&self) -> bool {
        self.scheduled_start.is_some() && self.scheduled_end.is_some()
    }

    pub fn is_unscheduled(&self) -> bool {
        self.scheduled_start.is_none() && !self.is_completed()
    }

    /// Placed length in minutes, falling back to the estimate when the end
    /// is missing. Never below one minute.
    pub fn placed_minutes(&self) -> i64 {
        match (self.scheduled_start, self.scheduled_end) {
            (Some(start), Some(end)) => {
                let seconds = end.signed_duration_since(start).num_seconds() as f64;
                ((seconds / 60.0).round() as i64).max(1)
            }
            _ => self.estimated_minutes.max(1),
        }
    }

    pub fn scheduled_on(&self, date: NaiveDate) -> bool {
        self.scheduled_start
            .map(|start| start.date() == date)
            .unwrap_or(false)
    }

    pub fn apply_patch(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(estimate) = patch.estimated_minutes {
            self.estimated_minutes = estimate;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(start) = patch.scheduled_start {
            self.scheduled_start = start;
        }
        if let Some(end) = patch.scheduled_end {
            self.scheduled_end = end;
        }
        if let Some(actual) = patch.actual_minutes {
            self.actual_minutes = actual;
        }
        if let Some(completed_at) = patch.completed_at {
            self.completed_at = completed_at;
        }
    }
}

/// Partial update. Outer `None` leaves a field untouched; `Some(None)`
/// clears a nullable field.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub estimated_minutes: Option<i64>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub scheduled_start: Option<Option<NaiveDateTime>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub scheduled_end: Option<Option<NaiveDateTime>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub actual_minutes: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Option<NaiveDateTime>>,
}

/// Keeps an explicit `null` apart from a missing field: `null` becomes
/// `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl TaskPatch {
    pub fn schedule(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            scheduled_start: Some(Some(start)),
            scheduled_end: Some(Some(end)),
            ..Default::default()
        }
    }

    pub fn clear_schedule() -> Self {
        Self {
            scheduled_start: Some(None),
            scheduled_end: Some(None),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    #[serde(default)]
    pub statuses: Vec<TaskStatus>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub unscheduled_only: bool,
    /// Inclusive date range on `scheduled_start`.
    #[serde(default)]
    pub scheduled_between: Option<(NaiveDate, NaiveDate)>,
}

impl TaskFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_ids(ids: Vec<String>) -> Self {
        Self {
            ids,
            ..Default::default()
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&task.status) {
            return false;
        }
        if let Some(project_id) = &self.project_id {
            if task.project_id.as_ref() != Some(project_id) {
                return false;
            }
        }
        if !self.ids.is_empty() && !self.ids.iter().any(|id| id == &task.id) {
            return false;
        }
        if self.unscheduled_only && !task.is_unscheduled() {
            return false;
        }
        if let Some((start, end)) = self.scheduled_between {
            match task.scheduled_start {
                Some(scheduled) => {
                    let day = scheduled.date();
                    if day < start || day > end {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Display ordering only.
    #[serde(default)]
    pub order: i32,
}
