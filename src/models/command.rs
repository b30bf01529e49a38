use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::analysis::ScheduleAnalysis;
use crate::models::schedule::{CalendarEvent, HabitBlock, WorkingSchedule};
use crate::models::scheduler::{GeneratedSchedule, PreferredTime, SchedulerDefaults};
use crate::models::task::{Milestone, Project, Task};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    ScheduleUnscheduled,
    ReschedulePeriod,
    OptimizeSchedule,
    EmergencyInsert,
    FindTime,
    ClearSchedule,
    AnalyzeSchedule,
    MoveTask,
    BatchSchedule,
    Rebalance,
}

impl CommandType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::ScheduleUnscheduled => "schedule_unscheduled",
            CommandType::ReschedulePeriod => "reschedule_period",
            CommandType::OptimizeSchedule => "optimize_schedule",
            CommandType::EmergencyInsert => "emergency_insert",
            CommandType::FindTime => "find_time",
            CommandType::ClearSchedule => "clear_schedule",
            CommandType::AnalyzeSchedule => "analyze_schedule",
            CommandType::MoveTask => "move_task",
            CommandType::BatchSchedule => "batch_schedule",
            CommandType::Rebalance => "rebalance",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommandScope {
    Day,
    #[default]
    Week,
    Month,
    Quarter,
    Year,
    All,
}

impl CommandScope {
    /// Number of calendar days covered, counting the target date.
    pub fn span_days(&self) -> i64 {
        match self {
            CommandScope::Day => 1,
            CommandScope::Week => 7,
            CommandScope::Month => 30,
            CommandScope::Quarter => 90,
            CommandScope::Year => 365,
            CommandScope::All => 365,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandConstraints {
    pub preferred_time: Option<PreferredTime>,
    pub must_complete_before: Option<NaiveDate>,
    pub max_hours_per_day: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandOptions {
    pub show_preview: bool,
    pub auto_apply: bool,
    pub preserve_fixed: bool,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            show_preview: true,
            auto_apply: false,
            preserve_fixed: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingCommand {
    #[serde(rename = "type")]
    pub command_type: CommandType,
    #[serde(default)]
    pub scope: CommandScope,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub target_task_ids: Vec<String>,
    #[serde(default)]
    pub target_project_id: Option<String>,
    #[serde(default)]
    pub urgency: Option<Urgency>,
    #[serde(default)]
    pub constraints: CommandConstraints,
    #[serde(default)]
    pub options: CommandOptions,
}

impl SchedulingCommand {
    pub fn new(command_type: CommandType, scope: CommandScope) -> Self {
        Self {
            command_type,
            scope,
            target_date: None,
            target_task_ids: Vec::new(),
            target_project_id: None,
            urgency: None,
            constraints: CommandConstraints::default(),
            options: CommandOptions::default(),
        }
    }

    pub fn with_target_date(mut self, date: NaiveDate) -> Self {
        self.target_date = Some(date);
        self
    }

    pub fn with_tasks(mut self, ids: Vec<String>) -> Self {
        self.target_task_ids = ids;
        self
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.target_project_id = Some(project_id.into());
        self
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = Some(urgency);
        self
    }

    pub fn with_constraints(mut self, constraints: CommandConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_options(mut self, options: CommandOptions) -> Self {
        self.options = options;
        self
    }
}

/// Snapshot the interpreter works from. Built fresh per request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingContext {
    pub user_id: String,
    pub today: NaiveDate,
    pub now: NaiveDateTime,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub habits: Vec<HabitBlock>,
    #[serde(default)]
    pub calendar_events: Vec<CalendarEvent>,
    #[serde(default)]
    pub working_schedule: WorkingSchedule,
    #[serde(default)]
    pub defaults: SchedulerDefaults,
}

impl SchedulingContext {
    pub fn new(user_id: impl Into<String>, now: NaiveDateTime) -> Self {
        Self {
            user_id: user_id.into(),
            today: now.date(),
            now,
            tasks: Vec::new(),
            projects: Vec::new(),
            milestones: Vec::new(),
            habits: Vec::new(),
            calendar_events: Vec::new(),
            working_schedule: WorkingSchedule::default(),
            defaults: SchedulerDefaults::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingCommandResult {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub preview: Option<GeneratedSchedule>,
    pub requires_confirmation: bool,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub analysis: Option<ScheduleAnalysis>,
    /// Tasks whose placement was written by this call.
    #[serde(default)]
    pub affected_tasks: usize,
}

impl SchedulingCommandResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            preview: None,
            requires_confirmation: false,
            warnings: Vec::new(),
            suggestions: Vec::new(),
            analysis: None,
            affected_tasks: 0,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::ok(message)
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Pending,
    Applied,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Pending => "pending",
            SessionStatus::Applied => "applied",
            SessionStatus::Cancelled => "cancelled",
        }
    }
}

/// Work held between `execute` and `confirm`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum PendingAction {
    ApplyPreview { schedule: GeneratedSchedule },
    ClearRange {
        start: NaiveDate,
        end: NaiveDate,
        task_ids: Vec<String>,
    },
}

/// `idle → pending → applied | cancelled`. Owned by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingSession {
    pub id: String,
    pub status: SessionStatus,
    #[serde(default)]
    pub command: Option<SchedulingCommand>,
    #[serde(default)]
    pub pending: Option<PendingAction>,
}

impl SchedulingSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            status: SessionStatus::Idle,
            command: None,
            pending: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == SessionStatus::Pending
    }

    pub fn preview(&self) -> Option<&GeneratedSchedule> {
        match &self.pending {
            Some(PendingAction::ApplyPreview { schedule }) => Some(schedule),
            _ => None,
        }
    }
}

impl Default for SchedulingSession {
    fn default() -> Self {
        Self::new()
    }
}
