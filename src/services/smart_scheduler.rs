use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::error::AppResult;
use crate::models::schedule::{
    BlockSource, BlockedInterval, CalendarEvent, HabitBlock, TimeInterval, WorkingSchedule,
};
use crate::models::scheduler::{
    GeneratedSchedule, IntensityMode, SchedulePreview, ScheduledSlot, SchedulerConfig,
    ScheduleWarning, WarningKind,
};
use crate::models::task::{Milestone, Project, Task, TaskPatch, TaskStatus};
use crate::services::capacity_service;
use crate::services::schedule_utils;
use crate::services::task_store::TaskStore;

/// Greedy, date-ordered placement of the task pool into free time.
///
/// Produces a preview only; nothing is written. Output is a pure function of
/// the inputs, including task order.
pub fn generate_smart_schedule(
    tasks: &[Task],
    config: &SchedulerConfig,
    working_schedule: &WorkingSchedule,
    milestones: &[Milestone],
    habits: &[HabitBlock],
    calendar_events: &[CalendarEvent],
) -> GeneratedSchedule {
    SmartScheduler::new(config, working_schedule).generate(
        tasks,
        milestones,
        habits,
        calendar_events,
    )
}

/// Clears placement on every task whose `scheduled_start` falls in
/// `[start, end]`. Returns how many tasks were cleared.
pub async fn unschedule_all_tasks(
    store: &dyn TaskStore,
    tasks: &[Task],
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<usize> {
    let mut cleared = 0;
    for task in tasks {
        let in_range = task
            .scheduled_start
            .map(|scheduled| {
                let day = scheduled.date();
                day >= start && day <= end
            })
            .unwrap_or(false);
        if !in_range {
            continue;
        }
        store
            .update_task(&task.id, TaskPatch::clear_schedule())
            .await?;
        cleared += 1;
    }

    info!(target: "app::scheduler", %start, %end, cleared, "schedule cleared");
    Ok(cleared)
}

/// Writes every slot of the preview onto its task. Re-applying the same
/// preview leaves the same final state.
pub async fn apply_schedule_preview(
    store: &dyn TaskStore,
    days: &[SchedulePreview],
) -> AppResult<usize> {
    let mut written = 0;
    for day in days {
        for slot in &day.slots {
            store
                .update_task(&slot.task_id, TaskPatch::schedule(slot.start, slot.end))
                .await?;
            written += 1;
        }
    }

    info!(target: "app::scheduler", days = days.len(), slots = written, "schedule preview applied");
    Ok(written)
}

/// Applies a whole scheduler run: writes every slot, then clears the tasks
/// that lost their previous slot without getting a new one. Returns
/// `(written, cleared)`.
pub async fn apply_generated_schedule(
    store: &dyn TaskStore,
    schedule: &GeneratedSchedule,
) -> AppResult<(usize, usize)> {
    let written = apply_schedule_preview(store, &schedule.days).await?;
    for task_id in &schedule.displaced_task_ids {
        store
            .update_task(task_id, TaskPatch::clear_schedule())
            .await?;
    }
    let cleared = schedule.displaced_task_ids.len();
    if cleared > 0 {
        info!(target: "app::scheduler", cleared, "displaced tasks unscheduled");
    }
    Ok((written, cleared))
}

/// Committed time on `date`: placed tasks (minus `exclude_ids`), habit
/// blocks and calendar events.
pub fn blocked_intervals_for_day(
    date: NaiveDate,
    tasks: &[Task],
    exclude_ids: &[&str],
    habits: &[HabitBlock],
    calendar_events: &[CalendarEvent],
) -> Vec<BlockedInterval> {
    let day = TimeInterval::new(
        schedule_utils::at_minute(date, 0),
        schedule_utils::at_minute(date, 24 * 60),
    );
    let mut blocked = Vec::new();

    for task in tasks {
        if exclude_ids.contains(&task.id.as_str()) {
            continue;
        }
        if let Some(interval) = task_interval(task) {
            if interval.overlaps(&day) {
                blocked.push(BlockedInterval {
                    interval,
                    source: BlockSource::Task(task.id.clone()),
                });
            }
        }
    }

    for habit in habits {
        if let Some(interval) = habit.interval_on(date) {
            blocked.push(BlockedInterval {
                interval,
                source: BlockSource::Habit(habit.id.clone()),
            });
        }
    }

    for event in calendar_events {
        let interval = event.interval();
        if interval.overlaps(&day) {
            blocked.push(BlockedInterval {
                interval,
                source: BlockSource::Calendar(event.id.clone()),
            });
        }
    }

    blocked
}

/// Earliest start in `[window_start, window_end)` where `minutes` fit
/// without touching any of `occupied`.
pub fn first_free_start(
    window_start: NaiveDateTime,
    window_end: NaiveDateTime,
    minutes: i64,
    occupied: &[TimeInterval],
) -> Option<NaiveDateTime> {
    if minutes <= 0 {
        return None;
    }
    let length = Duration::minutes(minutes);
    let mut sorted = occupied
        .iter()
        .filter(|interval| !interval.is_empty())
        .copied()
        .collect::<Vec<_>>();
    sorted.sort();

    let mut cursor = window_start;
    for interval in sorted {
        if interval.end <= cursor {
            continue;
        }
        if interval.start >= cursor + length {
            break;
        }
        cursor = schedule_utils::clamp_time_to_window(interval.end, cursor);
    }

    if cursor + length <= window_end {
        Some(cursor)
    } else {
        None
    }
}

/// Risk warnings for preview slots that land after their project's due
/// date. Placement itself never looks at projects.
pub fn project_deadline_warnings(
    schedule: &GeneratedSchedule,
    tasks: &[Task],
    projects: &[Project],
) -> Vec<ScheduleWarning> {
    let project_due = projects
        .iter()
        .filter_map(|project| project.due_date.map(|due| (project.id.as_str(), (project, due))))
        .collect::<HashMap<_, _>>();
    let task_project = tasks
        .iter()
        .filter_map(|task| task.project_id.as_deref().map(|project| (task.id.as_str(), project)))
        .collect::<HashMap<_, _>>();

    schedule
        .slots()
        .filter_map(|slot| {
            let project_id = task_project.get(slot.task_id.as_str())?;
            let (project, due) = project_due.get(project_id)?;
            (slot.start.date() > *due).then(|| {
                ScheduleWarning::for_task(
                    WarningKind::MilestoneRisk,
                    &slot.task_id,
                    format!(
                        "'{}' lands on {}, after project '{}' due {}",
                        slot.task_title,
                        slot.start.date(),
                        project.name,
                        due
                    ),
                )
            })
        })
        .collect()
}

fn task_interval(task: &Task) -> Option<TimeInterval> {
    let start = task.scheduled_start?;
    let end = task
        .scheduled_end
        .unwrap_or_else(|| start + Duration::minutes(task.placed_minutes()));
    Some(TimeInterval::new(start, end))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Regular,
    Overtime,
    NonWorkingDay,
}

#[derive(Debug, Clone, Copy)]
struct Attempt {
    tier: Tier,
    last_day: Option<NaiveDate>,
}

struct DayPlan {
    date: NaiveDate,
    is_working: bool,
    window_start: NaiveDateTime,
    regular_end: NaiveDateTime,
    overtime_end: NaiveDateTime,
    regular_budget: i64,
    lunch: Option<TimeInterval>,
    blocked: Vec<TimeInterval>,
    placed: Vec<TimeInterval>,
    used: i64,
    focus_used: i64,
    slots: Vec<ScheduledSlot>,
}

impl DayPlan {
    fn occupied(&self, break_minutes: i64) -> Vec<TimeInterval> {
        let padding = Duration::minutes(break_minutes.max(0));
        let mut occupied = self.blocked.clone();
        occupied.extend(self.lunch);
        occupied.extend(
            self.placed
                .iter()
                .map(|interval| TimeInterval::new(interval.start - padding, interval.end + padding)),
        );
        occupied
    }
}

pub struct SmartScheduler<'a> {
    config: &'a SchedulerConfig,
    working_schedule: &'a WorkingSchedule,
}

impl<'a> SmartScheduler<'a> {
    pub fn new(config: &'a SchedulerConfig, working_schedule: &'a WorkingSchedule) -> Self {
        Self {
            config,
            working_schedule,
        }
    }

    pub fn generate(
        &self,
        tasks: &[Task],
        milestones: &[Milestone],
        habits: &[HabitBlock],
        calendar_events: &[CalendarEvent],
    ) -> GeneratedSchedule {
        let mut result = GeneratedSchedule::default();

        if !self.config.has_valid_range() {
            result.warnings.push(ScheduleWarning::general(
                WarningKind::Unplaced,
                format!(
                    "end date {} is before start date {}; nothing was scheduled",
                    self.config.end_date, self.config.start_date
                ),
            ));
            return result;
        }

        let (pool, fixed) = self.partition(tasks);
        let pool_ids = pool.iter().map(|task| task.id.as_str()).collect::<Vec<_>>();
        let mut days = self.build_days(&fixed, &pool_ids, habits, calendar_events);
        let ordered = self.order_tasks(&pool);

        debug!(
            target: "app::scheduler",
            pool = ordered.len(),
            fixed = fixed.len(),
            days = days.len(),
            mode = %self.config.intensity_mode,
            "starting placement"
        );

        let focus_active = self.focus_active();
        let mut non_focus_remaining = ordered
            .iter()
            .filter(|task| !self.is_focus(task))
            .count();
        let milestone_due = milestones
            .iter()
            .filter_map(|milestone| milestone.due_date.map(|due| (milestone.id.as_str(), (milestone, due))))
            .collect::<HashMap<_, _>>();

        let mut needed_minutes = 0;
        for task in ordered {
            let is_focus = self.is_focus(task);
            if !is_focus {
                non_focus_remaining -= 1;
            }

            if task.estimated_minutes <= 0 {
                result.unplaced_task_ids.push(task.id.clone());
                result.warnings.push(ScheduleWarning::for_task(
                    WarningKind::InvalidTask,
                    &task.id,
                    format!(
                        "'{}' has a non-positive estimate ({} min) and was skipped",
                        task.title, task.estimated_minutes
                    ),
                ));
                continue;
            }
            needed_minutes += task.estimated_minutes;

            let cap = if focus_active && is_focus && non_focus_remaining > 0 {
                Some(self.config.focus_project_ratio)
            } else {
                None
            };

            match self.place(task, &mut days, cap) {
                Some((index, tier, start)) => {
                    let day = &days[index];
                    self.annotate_placement(task, day.date, tier, &milestone_due, &mut result);
                    let day = &mut days[index];
                    let end = start + Duration::minutes(task.estimated_minutes);
                    day.placed.push(TimeInterval::new(start, end));
                    day.used += task.estimated_minutes;
                    if is_focus {
                        day.focus_used += task.estimated_minutes;
                    }
                    day.slots.push(ScheduledSlot {
                        task_id: task.id.clone(),
                        task_title: task.title.clone(),
                        start,
                        end,
                    });
                }
                None => {
                    result.unplaced_task_ids.push(task.id.clone());
                    result.warnings.push(self.unplaced_warning(task));
                    if let Some(previous) = task.scheduled_start {
                        result.displaced_task_ids.push(task.id.clone());
                        result.warnings.push(ScheduleWarning::for_task(
                            WarningKind::Displaced,
                            &task.id,
                            format!(
                                "'{}' found no new slot; its {} placement will be cleared",
                                task.title,
                                previous.format("%Y-%m-%d %H:%M")
                            ),
                        ));
                    }
                }
            }
        }

        let budget: i64 = days.iter().map(|day| day.regular_budget).sum();
        if needed_minutes > budget {
            let overrun = if budget > 0 {
                ((needed_minutes - budget) as f64 / budget as f64 * 100.0).round() as i64
            } else {
                100
            };
            result.warnings.push(ScheduleWarning::general(
                WarningKind::CapacityExceeded,
                format!("scheduled load exceeds available capacity by {overrun}%"),
            ));
        }

        for mut day in days {
            if day.slots.is_empty() {
                continue;
            }
            day.slots
                .sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.task_id.cmp(&b.task_id)));
            result.days.push(SchedulePreview {
                date: day.date,
                slots: day.slots,
            });
        }

        info!(
            target: "app::scheduler",
            placed = result.slot_count(),
            unplaced = result.unplaced_task_ids.len(),
            warnings = result.warnings.len(),
            "schedule preview generated"
        );

        result
    }

    /// Splits tasks into the pool to place and the placed ones that block time.
    fn partition<'t>(&self, tasks: &'t [Task]) -> (Vec<&'t Task>, Vec<&'t Task>) {
        let mut pool = Vec::new();
        let mut fixed = Vec::new();

        for task in tasks {
            let selected =
                self.config.task_ids.is_empty() || self.config.task_ids.iter().any(|id| id == &task.id);

            if task.is_completed() || !selected {
                if task.scheduled_start.is_some() {
                    fixed.push(task);
                }
                continue;
            }

            if task.scheduled_start.is_none() {
                pool.push(task);
                continue;
            }

            let in_range = task
                .scheduled_start
                .map(|start| start.date() >= self.config.start_date && start.date() <= self.config.end_date)
                .unwrap_or(false);
            let pinned = self.config.preserve_fixed && task.status == TaskStatus::InProgress;

            if self.config.reschedule_existing && in_range && !pinned {
                pool.push(task);
            } else {
                fixed.push(task);
            }
        }

        (pool, fixed)
    }

    fn build_days(
        &self,
        fixed: &[&Task],
        pool_ids: &[&str],
        habits: &[HabitBlock],
        calendar_events: &[CalendarEvent],
    ) -> Vec<DayPlan> {
        let fixed_tasks = fixed.iter().map(|task| (*task).clone()).collect::<Vec<_>>();
        let lunch_window = self
            .config
            .lunch_break
            .or(self.working_schedule.lunch_break);
        let first_day = self.config.start_date.max(self.config.today);
        let overtime = Duration::minutes(self.config.overtime_minutes());
        let overtime_in_regular = self.overtime_in_regular();

        schedule_utils::date_range(first_day, self.config.end_date)
            .map(|date| {
                let window = self.working_schedule.window().on(date);
                let is_working = self.working_schedule.is_working_day(date)
                    && !self.working_schedule.is_holiday(date);
                let available = capacity_service::available_minutes(
                    date,
                    self.working_schedule,
                    lunch_window.as_ref(),
                    &[],
                );
                let mut regular_budget =
                    (available as f64 * self.config.intensity_mode.capacity_fraction()).floor() as i64;
                if overtime_in_regular {
                    regular_budget += self.config.overtime_minutes();
                }
                if let Some(cap) = self.config.max_minutes_per_day {
                    regular_budget = regular_budget.min(cap.max(0));
                }

                let overtime_end = window.end + overtime;
                let regular_end = if overtime_in_regular {
                    overtime_end
                } else {
                    window.end
                };

                let blocked = blocked_intervals_for_day(date, &fixed_tasks, pool_ids, habits, calendar_events)
                    .into_iter()
                    .map(|blocked| blocked.interval)
                    .collect::<Vec<_>>();
                let full_window = TimeInterval::new(window.start, overtime_end);
                let used = blocked
                    .iter()
                    .map(|interval| interval.overlap_minutes(&full_window))
                    .sum();

                DayPlan {
                    date,
                    is_working,
                    window_start: window.start,
                    regular_end,
                    overtime_end,
                    regular_budget,
                    lunch: lunch_window.map(|lunch| lunch.on(date)),
                    blocked,
                    placed: Vec::new(),
                    used,
                    focus_used: 0,
                    slots: Vec::new(),
                }
            })
            .collect()
    }

    /// Due date ascending (dated before undated), then priority, then focus
    /// membership, then input order.
    fn order_tasks<'t>(&self, pool: &[&'t Task]) -> Vec<&'t Task> {
        let focus_active = self.focus_active();
        let mut indexed = pool.iter().copied().enumerate().collect::<Vec<_>>();
        indexed.sort_by(|(a_idx, a), (b_idx, b)| {
            compare_due_dates(a.due_date, b.due_date)
                .then_with(|| b.priority.rank().cmp(&a.priority.rank()))
                .then_with(|| {
                    if focus_active {
                        self.is_focus(b).cmp(&self.is_focus(a))
                    } else {
                        Ordering::Equal
                    }
                })
                .then_with(|| a_idx.cmp(b_idx))
        });
        indexed.into_iter().map(|(_, task)| task).collect()
    }

    fn attempts(&self, task: &Task) -> Vec<Attempt> {
        let overtime_tier = self.config.allow_overtime && !self.overtime_in_regular();
        let mut attempts = Vec::new();

        match task.due_date {
            None => attempts.push(Attempt {
                tier: Tier::Regular,
                last_day: None,
            }),
            Some(due) => {
                let last_day = Some(self.config.last_safe_day(due));
                attempts.push(Attempt {
                    tier: Tier::Regular,
                    last_day,
                });
                if overtime_tier {
                    attempts.push(Attempt {
                        tier: Tier::Overtime,
                        last_day,
                    });
                }
                if self.config.strict_deadlines {
                    if self.config.allow_overtime {
                        attempts.push(Attempt {
                            tier: Tier::NonWorkingDay,
                            last_day,
                        });
                    }
                } else {
                    attempts.push(Attempt {
                        tier: Tier::Regular,
                        last_day: None,
                    });
                    if overtime_tier {
                        attempts.push(Attempt {
                            tier: Tier::Overtime,
                            last_day: None,
                        });
                    }
                }
            }
        }

        attempts
    }

    fn place(
        &self,
        task: &Task,
        days: &mut [DayPlan],
        focus_cap: Option<f64>,
    ) -> Option<(usize, Tier, NaiveDateTime)> {
        let caps = match focus_cap {
            Some(ratio) => vec![Some(ratio), None],
            None => vec![None],
        };

        for attempt in self.attempts(task) {
            for cap in &caps {
                for (index, day) in days.iter().enumerate() {
                    if let Some(last_day) = attempt.last_day {
                        if day.date > last_day {
                            break;
                        }
                    }
                    if let Some(start) = self.try_day(day, attempt.tier, task.estimated_minutes, *cap) {
                        return Some((index, attempt.tier, start));
                    }
                }
            }
        }

        None
    }

    fn try_day(
        &self,
        day: &DayPlan,
        tier: Tier,
        minutes: i64,
        focus_cap: Option<f64>,
    ) -> Option<NaiveDateTime> {
        let overtime = self.config.overtime_minutes();
        let (window_end, mut limit) = match tier {
            Tier::Regular if day.is_working => (day.regular_end, day.regular_budget),
            Tier::Overtime if day.is_working => (day.overtime_end, day.regular_budget + overtime),
            Tier::NonWorkingDay if !day.is_working => (day.regular_end, overtime),
            _ => return None,
        };
        if let Some(cap) = self.config.max_minutes_per_day {
            limit = limit.min(cap.max(0));
        }

        if day.used + minutes > limit {
            return None;
        }
        if let Some(ratio) = focus_cap {
            let focus_limit = (limit as f64 * ratio).floor() as i64;
            if day.focus_used + minutes > focus_limit {
                return None;
            }
        }

        first_free_start(
            day.window_start,
            window_end,
            minutes,
            &day.occupied(self.config.breaks_between_tasks),
        )
    }

    fn annotate_placement(
        &self,
        task: &Task,
        date: NaiveDate,
        tier: Tier,
        milestone_due: &HashMap<&str, (&Milestone, NaiveDate)>,
        result: &mut GeneratedSchedule,
    ) {
        match tier {
            Tier::Overtime => result.warnings.push(ScheduleWarning::for_task(
                WarningKind::Overtime,
                &task.id,
                format!("'{}' needs overtime on {}", task.title, date),
            )),
            Tier::NonWorkingDay => result.warnings.push(ScheduleWarning::for_task(
                WarningKind::NonWorkingDay,
                &task.id,
                format!(
                    "'{}' was placed on non-working day {} to meet its deadline",
                    task.title, date
                ),
            )),
            Tier::Regular => {}
        }

        if let Some(due) = task.due_date {
            let last_day = self.config.last_safe_day(due);
            if date > last_day {
                result.warnings.push(ScheduleWarning::for_task(
                    WarningKind::DeadlineRisk,
                    &task.id,
                    format!(
                        "'{}' is scheduled on {}, after its safe date {} (due {})",
                        task.title, date, last_day, due
                    ),
                ));
            }
        }

        if let Some(milestone_id) = task.milestone_id.as_deref() {
            if let Some((milestone, due)) = milestone_due.get(milestone_id) {
                if date > *due {
                    result.warnings.push(ScheduleWarning::for_task(
                        WarningKind::MilestoneRisk,
                        &task.id,
                        format!(
                            "'{}' lands on {}, after milestone '{}' due {}",
                            task.title, date, milestone.title, due
                        ),
                    ));
                }
            }
        }
    }

    fn unplaced_warning(&self, task: &Task) -> ScheduleWarning {
        match task.due_date {
            Some(due) if self.config.strict_deadlines => {
                let last_day = self.config.last_safe_day(due);
                ScheduleWarning::for_task(
                    WarningKind::InfeasibleDeadline,
                    &task.id,
                    format!(
                        "'{}' ({} min) cannot be scheduled by {} (due {}) within available capacity; deadline cannot be met",
                        task.title, task.estimated_minutes, last_day, due
                    ),
                )
            }
            _ => ScheduleWarning::for_task(
                WarningKind::Unplaced,
                &task.id,
                format!(
                    "'{}' ({} min) did not fit anywhere between {} and {}",
                    task.title, task.estimated_minutes, self.config.start_date, self.config.end_date
                ),
            ),
        }
    }

    fn focus_active(&self) -> bool {
        !self.config.focus_projects.is_empty() && self.config.focus_project_ratio > 0.0
    }

    fn is_focus(&self, task: &Task) -> bool {
        self.config.is_focus_project(task.project_id.as_deref())
    }

    fn overtime_in_regular(&self) -> bool {
        self.config.allow_overtime && self.config.intensity_mode == IntensityMode::DeadlineDriven
    }
}

fn compare_due_dates(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
