use std::convert::TryFrom;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{named_params, Connection, OptionalExtension, Row};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::task::{Task, TaskPriority, TaskStatus};
use crate::services::schedule_utils;

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const BASE_SELECT: &str = r#"
    SELECT
        id,
        title,
        status,
        priority,
        estimated_minutes,
        due_date,
        scheduled_start,
        scheduled_end,
        project_id,
        milestone_id,
        blocked_by,
        actual_minutes,
        completed_at,
        created_at,
        updated_at
    FROM tasks
"#;

/// Column-for-column image of a `tasks` row. Dates are kept as text.
#[derive(Debug, Clone)]
pub struct TaskRow {
    pub id: String,
    pub title: String,
    pub status: String,
    pub priority: String,
    pub estimated_minutes: i64,
    pub due_date: Option<String>,
    pub scheduled_start: Option<String>,
    pub scheduled_end: Option<String>,
    pub project_id: Option<String>,
    pub milestone_id: Option<String>,
    pub blocked_by: Option<String>,
    pub actual_minutes: Option<i64>,
    pub completed_at: Option<String>,
}

impl TaskRow {
    pub fn from_task(task: &Task) -> AppResult<Self> {
        Ok(Self {
            id: task.id.clone(),
            title: task.title.clone(),
            status: task.status.as_str().to_string(),
            priority: task.priority.as_str().to_string(),
            estimated_minutes: task.estimated_minutes,
            due_date: task.due_date.map(schedule_utils::format_date),
            scheduled_start: task.scheduled_start.map(format_datetime),
            scheduled_end: task.scheduled_end.map(format_datetime),
            project_id: task.project_id.clone(),
            milestone_id: task.milestone_id.clone(),
            blocked_by: serialize_vec(&task.blocked_by)?,
            actual_minutes: task.actual_minutes,
            completed_at: task.completed_at.map(format_datetime),
        })
    }

    pub fn into_task(self) -> AppResult<Task> {
        let status = TaskStatus::try_from(self.status.as_str()).map_err(AppError::validation)?;
        let priority =
            TaskPriority::try_from(self.priority.as_str()).map_err(AppError::validation)?;

        Ok(Task {
            id: self.id,
            title: self.title,
            status,
            priority,
            estimated_minutes: self.estimated_minutes,
            due_date: parse_optional_date(self.due_date)?,
            scheduled_start: parse_optional_datetime(self.scheduled_start)?,
            scheduled_end: parse_optional_datetime(self.scheduled_end)?,
            project_id: self.project_id,
            milestone_id: self.milestone_id,
            blocked_by: deserialize_vec(self.blocked_by)?,
            actual_minutes: self.actual_minutes,
            completed_at: parse_optional_datetime(self.completed_at)?,
        })
    }
}

impl TryFrom<&Row<'_>> for TaskRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(TaskRow {
            id: row.get("id")?,
            title: row.get("title")?,
            status: row.get("status")?,
            priority: row.get("priority")?,
            estimated_minutes: row.get("estimated_minutes")?,
            due_date: row.get("due_date")?,
            scheduled_start: row.get("scheduled_start")?,
            scheduled_end: row.get("scheduled_end")?,
            project_id: row.get("project_id")?,
            milestone_id: row.get("milestone_id")?,
            blocked_by: row.get("blocked_by")?,
            actual_minutes: row.get("actual_minutes")?,
            completed_at: row.get("completed_at")?,
        })
    }
}

pub struct TaskRepository;

impl TaskRepository {
    pub fn insert(conn: &Connection, row: &TaskRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO tasks (
                    id,
                    title,
                    status,
                    priority,
                    estimated_minutes,
                    due_date,
                    scheduled_start,
                    scheduled_end,
                    project_id,
                    milestone_id,
                    blocked_by,
                    actual_minutes,
                    completed_at
                ) VALUES (
                    :id,
                    :title,
                    :status,
                    :priority,
                    :estimated_minutes,
                    :due_date,
                    :scheduled_start,
                    :scheduled_end,
                    :project_id,
                    :milestone_id,
                    :blocked_by,
                    :actual_minutes,
                    :completed_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":title": &row.title,
                ":status": &row.status,
                ":priority": &row.priority,
                ":estimated_minutes": &row.estimated_minutes,
                ":due_date": &row.due_date,
                ":scheduled_start": &row.scheduled_start,
                ":scheduled_end": &row.scheduled_end,
                ":project_id": &row.project_id,
                ":milestone_id": &row.milestone_id,
                ":blocked_by": &row.blocked_by,
                ":actual_minutes": &row.actual_minutes,
                ":completed_at": &row.completed_at,
            },
        )?;

        Ok(())
    }

    pub fn update(conn: &Connection, row: &TaskRow) -> AppResult<()> {
        let affected = conn.execute(
            r#"
                UPDATE tasks SET
                    title = :title,
                    status = :status,
                    priority = :priority,
                    estimated_minutes = :estimated_minutes,
                    due_date = :due_date,
                    scheduled_start = :scheduled_start,
                    scheduled_end = :scheduled_end,
                    project_id = :project_id,
                    milestone_id = :milestone_id,
                    blocked_by = :blocked_by,
                    actual_minutes = :actual_minutes,
                    completed_at = :completed_at,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = :id
            "#,
            named_params! {
                ":id": &row.id,
                ":title": &row.title,
                ":status": &row.status,
                ":priority": &row.priority,
                ":estimated_minutes": &row.estimated_minutes,
                ":due_date": &row.due_date,
                ":scheduled_start": &row.scheduled_start,
                ":scheduled_end": &row.scheduled_end,
                ":project_id": &row.project_id,
                ":milestone_id": &row.milestone_id,
                ":blocked_by": &row.blocked_by,
                ":actual_minutes": &row.actual_minutes,
                ":completed_at": &row.completed_at,
            },
        )?;

        if affected == 0 {
            return Err(AppError::not_found());
        }

        Ok(())
    }

    pub fn delete(conn: &Connection, id: &str) -> AppResult<()> {
        let affected = conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<TaskRow>> {
        let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", BASE_SELECT))?;
        let row = stmt
            .query_row([id], |row| TaskRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    /// Every task in insertion order.
    pub fn list_all(conn: &Connection) -> AppResult<Vec<TaskRow>> {
        let mut stmt = conn.prepare(&format!("{} ORDER BY rowid ASC", BASE_SELECT))?;
        let rows = stmt
            .query_map([], |row| TaskRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Tasks whose `scheduled_start` falls on a date in `[start, end]`.
    pub fn list_scheduled_between(
        conn: &Connection,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<TaskRow>> {
        let lower = format!("{}T00:00:00", schedule_utils::format_date(start));
        let upper = format!("{}T23:59:59", schedule_utils::format_date(end));
        let mut stmt = conn.prepare(&format!(
            "{} WHERE scheduled_start BETWEEN :lower AND :upper ORDER BY scheduled_start ASC, rowid ASC",
            BASE_SELECT
        ))?;
        let rows = stmt
            .query_map(named_params! {":lower": lower, ":upper": upper}, |row| {
                TaskRow::try_from(row)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn format_datetime(value: NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

fn parse_optional_date(raw: Option<String>) -> AppResult<Option<NaiveDate>> {
    match raw {
        Some(value) if !value.is_empty() => Ok(Some(schedule_utils::parse_date(&value)?)),
        _ => Ok(None),
    }
}

fn parse_optional_datetime(raw: Option<String>) -> AppResult<Option<NaiveDateTime>> {
    match raw {
        Some(value) if !value.is_empty() => NaiveDateTime::parse_from_str(&value, DATETIME_FORMAT)
            .map(Some)
            .map_err(|err| {
                AppError::validation_with_details(
                    "invalid stored timestamp",
                    json!({"value": value, "error": err.to_string()}),
                )
            }),
        _ => Ok(None),
    }
}

fn serialize_vec(values: &[String]) -> AppResult<Option<String>> {
    if values.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(values)?))
    }
}

fn deserialize_vec(raw: Option<String>) -> AppResult<Vec<String>> {
    match raw {
        Some(value) if !value.is_empty() => Ok(serde_json::from_str(&value)?),
        _ => Ok(Vec::new()),
    }
}
