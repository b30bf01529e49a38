use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::task::TaskPriority;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeadlineTaskInsight {
    pub task_id: String,
    pub title: String,
    pub priority: TaskPriority,
    pub due_date: NaiveDate,
    pub estimated_minutes: i64,
    /// Negative when overdue.
    pub days_until_due: i64,
    pub can_schedule: bool,
    pub is_scheduled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleAnalysis {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_tasks: usize,
    pub schedulable_tasks: usize,
    pub total_minutes_needed: i64,
    pub total_minutes_available: i64,
    pub utilization_percent: i64,
    pub working_days: usize,
    pub deadline_tasks: Vec<DeadlineTaskInsight>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

impl ScheduleAnalysis {
    pub fn is_feasible(&self) -> bool {
        self.utilization_percent <= 100 && self.deadline_tasks.iter().all(|task| task.can_schedule)
    }

    pub fn at_risk_tasks(&self) -> impl Iterator<Item = &DeadlineTaskInsight> {
        self.deadline_tasks.iter().filter(|task| !task.can_schedule)
    }
}
