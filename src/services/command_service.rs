use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::models::command::{
    CommandType, PendingAction, SchedulingCommand, SchedulingCommandResult, SchedulingContext,
    SchedulingSession, SessionStatus, Urgency,
};
use crate::models::schedule::{TimeInterval, WorkingSchedule};
use crate::models::scheduler::{
    GeneratedSchedule, PreferredTime, SchedulePreview, ScheduledSlot, SchedulerConfig,
    WarningKind,
};
use crate::models::settings::SchedulingProfile;
use crate::models::task::{Task, TaskFilter, TaskPatch, DEFAULT_ESTIMATED_MINUTES};
use crate::services::schedule_analyzer;
use crate::services::schedule_utils;
use crate::services::settings_service::SchedulingSettingsService;
use crate::services::smart_scheduler;
use crate::services::task_store::{BlockedIntervalProvider, TaskStore};

const FIND_TIME_SUGGESTIONS: usize = 3;
const CALENDAR_HORIZON_DAYS: i64 = 365;

/// Builds a context from the stores as of `now`.
pub async fn build_context(
    user_id: &str,
    now: NaiveDateTime,
    store: &dyn TaskStore,
    provider: &dyn BlockedIntervalProvider,
    profile: SchedulingProfile,
) -> AppResult<SchedulingContext> {
    let today = now.date();
    let mut context = SchedulingContext::new(user_id, now);
    context.tasks = store.list_tasks(&TaskFilter::all()).await?;
    context.habits = provider.habits().await?;
    context.calendar_events = provider
        .calendar_events(today, today + Duration::days(CALENDAR_HORIZON_DAYS))
        .await?;
    context.working_schedule = profile.working_schedule;
    context.defaults = profile.defaults;

    debug!(
        target: "app::commands",
        user_id,
        tasks = context.tasks.len(),
        habits = context.habits.len(),
        events = context.calendar_events.len(),
        "scheduling context built"
    );
    Ok(context)
}

/// Same as [`build_context`], with "now" taken from the wall clock in the
/// configured timezone.
pub async fn load_context(
    user_id: &str,
    store: &dyn TaskStore,
    provider: &dyn BlockedIntervalProvider,
    settings: &SchedulingSettingsService,
) -> AppResult<SchedulingContext> {
    let profile = settings.get_profile()?;
    let now = schedule_utils::local_now(profile.working_schedule.timezone.as_deref())?;
    build_context(user_id, now, store, provider, profile).await
}

#[derive(Debug, Clone, Copy)]
struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

/// Turns [`SchedulingCommand`]s into scheduler, analyzer and store calls.
///
/// Multi-task changes come back as previews held on the caller's
/// [`SchedulingSession`] and are only written by [`Self::confirm`].
pub struct SchedulingCommandService {
    store: Arc<dyn TaskStore>,
    apply_lock: Mutex<()>,
}

impl SchedulingCommandService {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self {
            store,
            apply_lock: Mutex::new(()),
        }
    }

    pub async fn execute(
        &self,
        session: &mut SchedulingSession,
        command: SchedulingCommand,
        context: &SchedulingContext,
    ) -> AppResult<SchedulingCommandResult> {
        info!(
            target: "app::commands",
            session = %session.id,
            command = %command.command_type,
            scope = ?command.scope,
            "executing scheduling command"
        );

        if needs_session(&command) && session.status != SessionStatus::Idle {
            let message = match session.status {
                SessionStatus::Pending => {
                    "a command is already waiting for confirmation; confirm or cancel it first"
                        .to_string()
                }
                status => format!("session is already {}; start a new session", status.as_str()),
            };
            warn!(target: "app::commands", session = %session.id, %message, "command rejected");
            return Ok(SchedulingCommandResult::failure(message));
        }

        let range = match resolve_range(&command, context) {
            Ok(range) => range,
            Err(message) => return Ok(SchedulingCommandResult::failure(message)),
        };
        if let Err(message) = check_targets(&command, context) {
            return Ok(SchedulingCommandResult::failure(message));
        }
        let config = match build_config(&command, context, range) {
            Ok(config) => config,
            Err(message) => return Ok(SchedulingCommandResult::failure(message)),
        };

        match command.command_type {
            CommandType::ScheduleUnscheduled
            | CommandType::ReschedulePeriod
            | CommandType::OptimizeSchedule
            | CommandType::BatchSchedule
            | CommandType::Rebalance => Ok(self.preview(session, command, context, config, range)),
            CommandType::ClearSchedule => self.clear(session, command, context, range).await,
            CommandType::AnalyzeSchedule => Ok(analyze(context, &config)),
            CommandType::MoveTask | CommandType::EmergencyInsert => {
                self.relocate(&command, context, &config, range).await
            }
            CommandType::FindTime => Ok(find_time(&command, context, &config, range)),
        }
    }

    /// Writes whatever the session is holding. Returns a failure result,
    /// not an error, when nothing is pending.
    pub async fn confirm(&self, session: &mut SchedulingSession) -> AppResult<SchedulingCommandResult> {
        let action = match (&session.status, &session.pending) {
            (SessionStatus::Pending, Some(action)) => action.clone(),
            _ => {
                return Ok(SchedulingCommandResult::failure(
                    "nothing is pending confirmation",
                ))
            }
        };

        let _guard = self.apply_lock.lock().await;
        let (affected, message) = match &action {
            PendingAction::ApplyPreview { schedule } => {
                let (written, cleared) =
                    smart_scheduler::apply_generated_schedule(self.store.as_ref(), schedule).await?;
                let message = if cleared > 0 {
                    format!("Scheduled {written} task(s), unscheduled {cleared}")
                } else {
                    format!("Scheduled {written} task(s)")
                };
                (written + cleared, message)
            }
            PendingAction::ClearRange {
                start,
                end,
                task_ids,
            } => {
                let current = if task_ids.is_empty() {
                    Vec::new()
                } else {
                    self.store
                        .list_tasks(&TaskFilter::by_ids(task_ids.clone()))
                        .await?
                };
                let cleared =
                    smart_scheduler::unschedule_all_tasks(self.store.as_ref(), &current, *start, *end)
                        .await?;
                (cleared, format!("Unscheduled {cleared} task(s)"))
            }
        };

        session.status = SessionStatus::Applied;
        session.pending = None;
        info!(target: "app::commands", session = %session.id, affected, "pending command applied");

        let mut result = SchedulingCommandResult::ok(message);
        result.affected_tasks = affected;
        Ok(result)
    }

    pub fn cancel_pending(&self, session: &mut SchedulingSession) -> SchedulingCommandResult {
        if !session.is_pending() {
            return SchedulingCommandResult::failure("nothing is pending to cancel");
        }
        session.status = SessionStatus::Cancelled;
        session.pending = None;
        info!(target: "app::commands", session = %session.id, "pending command cancelled");
        SchedulingCommandResult::ok("Pending changes discarded")
    }

    fn preview(
        &self,
        session: &mut SchedulingSession,
        command: SchedulingCommand,
        context: &SchedulingContext,
        mut config: SchedulerConfig,
        range: DateRange,
    ) -> SchedulingCommandResult {
        let pool = pool_for(&command, context, range);
        if pool.is_empty() {
            return SchedulingCommandResult::ok(format!(
                "Nothing to {} between {} and {}",
                command.command_type, range.start, range.end
            ));
        }
        config.reschedule_existing = command.command_type != CommandType::ScheduleUnscheduled;
        if command.command_type == CommandType::Rebalance {
            let placed = context
                .tasks
                .iter()
                .filter(|task| pool.contains(&task.id))
                .collect::<Vec<_>>();
            let Some(cap) = rebalance_cap(&placed, &context.working_schedule, range, context.today)
            else {
                return SchedulingCommandResult::failure("no working days in range to rebalance across");
            };
            config.max_minutes_per_day =
                Some(config.max_minutes_per_day.map_or(cap, |limit| limit.min(cap)));
        }
        config.task_ids = pool;

        let mut schedule = smart_scheduler::generate_smart_schedule(
            &context.tasks,
            &config,
            &context.working_schedule,
            &context.milestones,
            &context.habits,
            &context.calendar_events,
        );
        let project_warnings =
            smart_scheduler::project_deadline_warnings(&schedule, &context.tasks, &context.projects);
        schedule.warnings.extend(project_warnings);

        let warnings = schedule
            .warnings
            .iter()
            .map(|warning| warning.message.clone())
            .collect::<Vec<_>>();
        let suggestions = if schedule.unplaced_task_ids.is_empty() {
            Vec::new()
        } else {
            schedule_analyzer::analyze_schedule(&context.tasks, &config, &context.working_schedule)
                .recommendations
        };

        let placed = schedule.slot_count();
        if placed == 0 {
            let blocked_by_deadline = config.strict_deadlines
                && !config.allow_overtime
                && schedule
                    .warnings
                    .iter()
                    .any(|warning| warning.kind == WarningKind::InfeasibleDeadline);
            let mut result = if blocked_by_deadline {
                SchedulingCommandResult::failure(
                    "Nothing can be scheduled without missing a strict deadline",
                )
            } else {
                SchedulingCommandResult::ok("Nothing to schedule in this range")
            };
            result.warnings = warnings;
            result.suggestions = suggestions;
            return result;
        }

        let days = schedule.days.len();
        let mut result = SchedulingCommandResult::ok(format!(
            "{placed} task(s) across {days} day(s) ready to apply"
        ));
        result.requires_confirmation = true;
        result.warnings = warnings;
        result.suggestions = suggestions;
        if command.options.show_preview {
            result.preview = Some(schedule.clone());
        }

        session.status = SessionStatus::Pending;
        session.command = Some(command);
        session.pending = Some(PendingAction::ApplyPreview { schedule });
        debug!(target: "app::commands", session = %session.id, placed, "preview held for confirmation");
        result
    }

    async fn clear(
        &self,
        session: &mut SchedulingSession,
        command: SchedulingCommand,
        context: &SchedulingContext,
        range: DateRange,
    ) -> AppResult<SchedulingCommandResult> {
        let task_ids = selected_tasks(&command, context)
            .filter(|task| placed_within(task, range))
            .map(|task| task.id.clone())
            .collect::<Vec<_>>();
        if task_ids.is_empty() {
            return Ok(SchedulingCommandResult::ok(format!(
                "No scheduled tasks between {} and {}",
                range.start, range.end
            )));
        }

        if command.options.auto_apply {
            let _guard = self.apply_lock.lock().await;
            let current = self
                .store
                .list_tasks(&TaskFilter::by_ids(task_ids))
                .await?;
            let cleared = smart_scheduler::unschedule_all_tasks(
                self.store.as_ref(),
                &current,
                range.start,
                range.end,
            )
            .await?;
            let mut result = SchedulingCommandResult::ok(format!("Unscheduled {cleared} task(s)"));
            result.affected_tasks = cleared;
            return Ok(result);
        }

        let count = task_ids.len();
        let mut result = SchedulingCommandResult::ok(format!(
            "{count} task(s) between {} and {} will be unscheduled",
            range.start, range.end
        ));
        result.requires_confirmation = true;

        session.status = SessionStatus::Pending;
        session.command = Some(command);
        session.pending = Some(PendingAction::ClearRange {
            start: range.start,
            end: range.end,
            task_ids,
        });
        Ok(result)
    }

    /// Single-task placement for `move_task` and `emergency_insert`. The
    /// slot is chosen from the context, then checked against the store's
    /// current state before it is written.
    async fn relocate(
        &self,
        command: &SchedulingCommand,
        context: &SchedulingContext,
        config: &SchedulerConfig,
        range: DateRange,
    ) -> AppResult<SchedulingCommandResult> {
        let Some(task_id) = command.target_task_ids.first() else {
            return Ok(SchedulingCommandResult::failure(format!(
                "{} needs a target task",
                command.command_type
            )));
        };
        let Some(task) = context.tasks.iter().find(|task| &task.id == task_id) else {
            return Ok(SchedulingCommandResult::failure(format!("task {task_id} not found")));
        };
        if task.is_completed() {
            return Ok(SchedulingCommandResult::failure(format!(
                "'{}' is already completed",
                task.title
            )));
        }
        if task.estimated_minutes <= 0 {
            return Ok(SchedulingCommandResult::failure(format!(
                "'{}' has no usable estimate",
                task.title
            )));
        }

        let critical = command.command_type == CommandType::EmergencyInsert
            && command.urgency == Some(Urgency::Critical);
        let search = SlotSearch {
            range,
            earliest: context.now,
            preferred: command.constraints.preferred_time,
            overtime_minutes: config.overtime_minutes(),
            include_non_working: critical,
        };
        let Some(slot) = search
            .find(task, &context.tasks, context, 1)
            .into_iter()
            .next()
        else {
            return Ok(SchedulingCommandResult::failure(format!(
                "No free {} min slot for '{}' between {} and {}",
                task.estimated_minutes, task.title, range.start, range.end
            ))
            .with_suggestions(vec![
                "Try a wider scope".to_string(),
                "Allow overtime".to_string(),
            ]));
        };

        let _guard = self.apply_lock.lock().await;
        let current = self.store.list_tasks(&TaskFilter::all()).await?;
        if !current.iter().any(|existing| existing.id == task.id) {
            return Ok(SchedulingCommandResult::failure(format!(
                "'{}' no longer exists",
                task.title
            )));
        }
        if let Some(collision) = collision(slot, &task.id, &current, context) {
            warn!(
                target: "app::commands",
                task_id = %task.id,
                start = %slot.start,
                %collision,
                "slot taken since context was loaded"
            );
            return Ok(SchedulingCommandResult::failure(format!(
                "{} {} is no longer free ({collision}); reload and try again",
                slot.start.date(),
                schedule_utils::format_time_of_day(schedule_utils::midnight_minutes_of(slot.start))
            )));
        }

        self.store
            .update_task(&task.id, TaskPatch::schedule(slot.start, slot.end))
            .await?;
        info!(
            target: "app::commands",
            task_id = %task.id,
            start = %slot.start,
            end = %slot.end,
            critical,
            "task placed"
        );

        let mut result = SchedulingCommandResult::ok(format!(
            "'{}' scheduled for {}",
            task.title,
            describe_slot(slot)
        ));
        result.preview = Some(single_slot_preview(task, slot));
        result.affected_tasks = 1;
        if slot.end > context.working_schedule.window().on(slot.start.date()).end
            || !is_working(&context.working_schedule, slot.start.date())
        {
            result
                .warnings
                .push(format!("'{}' runs outside regular working hours", task.title));
        }
        Ok(result)
    }
}

/// Preview-producing commands, plus a clear that waits for confirmation.
fn needs_session(command: &SchedulingCommand) -> bool {
    match command.command_type {
        CommandType::ScheduleUnscheduled
        | CommandType::ReschedulePeriod
        | CommandType::OptimizeSchedule
        | CommandType::BatchSchedule
        | CommandType::Rebalance => true,
        CommandType::ClearSchedule => !command.options.auto_apply,
        _ => false,
    }
}

fn resolve_range(command: &SchedulingCommand, context: &SchedulingContext) -> Result<DateRange, String> {
    let start = command.target_date.unwrap_or(context.today);
    let mut end = start + Duration::days(command.scope.span_days() - 1);
    if let Some(deadline) = command.constraints.must_complete_before {
        end = end.min(deadline);
    }
    if end < start {
        return Err(format!("range ends on {end}, before it starts on {start}"));
    }
    Ok(DateRange { start, end })
}

fn check_targets(command: &SchedulingCommand, context: &SchedulingContext) -> Result<(), String> {
    if let Some(project_id) = &command.target_project_id {
        let known = context.projects.iter().any(|project| &project.id == project_id)
            || context
                .tasks
                .iter()
                .any(|task| task.project_id.as_ref() == Some(project_id));
        if !known {
            return Err(format!("unknown project {project_id}"));
        }
    }

    if command.command_type == CommandType::BatchSchedule && command.target_task_ids.is_empty() {
        return Err("batch_schedule needs at least one task id".to_string());
    }

    let unknown = command
        .target_task_ids
        .iter()
        .filter(|id| !context.tasks.iter().any(|task| task.id.as_str() == id.as_str()))
        .cloned()
        .collect::<Vec<_>>();
    if !unknown.is_empty() {
        return Err(format!("unknown task id(s): {}", unknown.join(", ")));
    }
    Ok(())
}

fn build_config(
    command: &SchedulingCommand,
    context: &SchedulingContext,
    range: DateRange,
) -> Result<SchedulerConfig, String> {
    let mut config =
        SchedulerConfig::with_defaults(range.start, range.end, context.today, &context.defaults);
    config.preserve_fixed = command.options.preserve_fixed;

    if command.constraints.must_complete_before.is_some() {
        config.strict_deadlines = true;
    }
    if let Some(hours) = command.constraints.max_hours_per_day {
        if !hours.is_finite() || hours <= 0.0 {
            return Err(format!("maxHoursPerDay must be positive, got {hours}"));
        }
        config.max_minutes_per_day = Some((hours * 60.0).round() as i64);
    }
    if command.command_type == CommandType::EmergencyInsert && command.urgency == Some(Urgency::Critical) {
        config.allow_overtime = true;
    }
    if let Some(project_id) = &command.target_project_id {
        config.focus_projects = vec![project_id.clone()];
    }

    Ok(config)
}

/// Ids the scheduler may move for a preview command.
fn pool_for(command: &SchedulingCommand, context: &SchedulingContext, range: DateRange) -> Vec<String> {
    selected_tasks(command, context)
        .filter(|task| match command.command_type {
            CommandType::ScheduleUnscheduled => task.is_unscheduled(),
            CommandType::ReschedulePeriod | CommandType::Rebalance => placed_within(task, range),
            _ => task.is_unscheduled() || placed_within(task, range),
        })
        .map(|task| task.id.clone())
        .collect()
}

/// Open tasks matching the command's ids and project.
fn selected_tasks<'a>(
    command: &'a SchedulingCommand,
    context: &'a SchedulingContext,
) -> impl Iterator<Item = &'a Task> + 'a {
    context.tasks.iter().filter(move |task| {
        !task.is_completed()
            && (command.target_task_ids.is_empty()
                || command.target_task_ids.iter().any(|id| id == &task.id))
            && command
                .target_project_id
                .as_ref()
                .map_or(true, |project| task.project_id.as_ref() == Some(project))
    })
}

fn placed_within(task: &Task, range: DateRange) -> bool {
    task.scheduled_start
        .map(|start| start.date() >= range.start && start.date() <= range.end)
        .unwrap_or(false)
}

fn is_working(schedule: &WorkingSchedule, date: NaiveDate) -> bool {
    schedule.is_working_day(date) && !schedule.is_holiday(date)
}

/// Placed minutes spread evenly over the range's remaining working days,
/// rounded up, but never below the longest task.
fn rebalance_cap(
    placed: &[&Task],
    schedule: &WorkingSchedule,
    range: DateRange,
    today: NaiveDate,
) -> Option<i64> {
    let working_days = schedule_utils::date_range(range.start.max(today), range.end)
        .filter(|date| is_working(schedule, *date))
        .count() as i64;
    if working_days == 0 {
        return None;
    }
    let total = placed.iter().map(|task| task.estimated_minutes.max(0)).sum::<i64>();
    let longest = placed
        .iter()
        .map(|task| task.estimated_minutes)
        .max()
        .unwrap_or(0);
    Some(((total + working_days - 1) / working_days).max(longest))
}

fn analyze(context: &SchedulingContext, config: &SchedulerConfig) -> SchedulingCommandResult {
    let analysis =
        schedule_analyzer::analyze_schedule(&context.tasks, config, &context.working_schedule);
    let mut result = SchedulingCommandResult::ok(format!(
        "{}% of capacity needed across {} working day(s)",
        analysis.utilization_percent, analysis.working_days
    ));
    result.warnings = analysis.warnings.clone();
    result.suggestions = analysis.recommendations.clone();
    result.analysis = Some(analysis);
    result
}

fn find_time(
    command: &SchedulingCommand,
    context: &SchedulingContext,
    config: &SchedulerConfig,
    range: DateRange,
) -> SchedulingCommandResult {
    let template = command
        .target_task_ids
        .first()
        .and_then(|id| context.tasks.iter().find(|task| &task.id == id))
        .cloned()
        .unwrap_or_else(|| {
            let mut task = Task::new("", "new task");
            task.estimated_minutes = DEFAULT_ESTIMATED_MINUTES;
            task
        });
    if template.estimated_minutes <= 0 {
        return SchedulingCommandResult::failure(format!(
            "'{}' has no usable estimate",
            template.title
        ));
    }

    let search = SlotSearch {
        range,
        earliest: context.now,
        preferred: command.constraints.preferred_time,
        overtime_minutes: config.overtime_minutes(),
        include_non_working: false,
    };
    let slots = search.find(&template, &context.tasks, context, FIND_TIME_SUGGESTIONS);
    if slots.is_empty() {
        return SchedulingCommandResult::failure(format!(
            "No free {} min slot between {} and {}",
            template.estimated_minutes, range.start, range.end
        ));
    }

    SchedulingCommandResult::ok(format!("Found {} free slot(s)", slots.len()))
        .with_suggestions(slots.into_iter().map(describe_slot).collect())
}

struct SlotSearch {
    range: DateRange,
    earliest: NaiveDateTime,
    preferred: Option<PreferredTime>,
    overtime_minutes: i64,
    include_non_working: bool,
}

impl SlotSearch {
    /// Up to `limit` slots, at most one per day. A preferred time that
    /// yields nothing is dropped and the search repeated.
    fn find(
        &self,
        task: &Task,
        tasks: &[Task],
        context: &SchedulingContext,
        limit: usize,
    ) -> Vec<TimeInterval> {
        let slots = self.scan(task, tasks, context, self.preferred, limit);
        if slots.is_empty() && self.preferred.is_some() {
            return self.scan(task, tasks, context, None, limit);
        }
        slots
    }

    fn scan(
        &self,
        task: &Task,
        tasks: &[Task],
        context: &SchedulingContext,
        preferred: Option<PreferredTime>,
        limit: usize,
    ) -> Vec<TimeInterval> {
        let schedule = &context.working_schedule;
        let minutes = task.estimated_minutes;
        let mut found = Vec::new();

        for date in schedule_utils::date_range(self.range.start, self.range.end) {
            if found.len() >= limit {
                break;
            }
            if date < self.earliest.date() {
                continue;
            }
            if !is_working(schedule, date) && !self.include_non_working {
                continue;
            }

            let window = schedule.window().on(date);
            let window_end = window.end + Duration::minutes(self.overtime_minutes);
            let mut start = schedule_utils::clamp_time_to_window(self.earliest, window.start);
            if let Some(preferred) = preferred {
                start = start.max(schedule_utils::at_minute(date, preferred.earliest_minute()));
            }

            let occupied = occupied_on(date, &task.id, tasks, context);
            if let Some(slot_start) =
                smart_scheduler::first_free_start(start, window_end, minutes, &occupied)
            {
                found.push(TimeInterval::new(
                    slot_start,
                    slot_start + Duration::minutes(minutes),
                ));
            }
        }

        found
    }
}

fn occupied_on(date: NaiveDate, task_id: &str, tasks: &[Task], context: &SchedulingContext) -> Vec<TimeInterval> {
    let mut occupied = smart_scheduler::blocked_intervals_for_day(
        date,
        tasks,
        &[task_id],
        &context.habits,
        &context.calendar_events,
    )
    .into_iter()
    .map(|blocked| blocked.interval)
    .collect::<Vec<_>>();
    occupied.extend(context.working_schedule.lunch_break.map(|lunch| lunch.on(date)));
    occupied
}

/// What, if anything, in `current` now overlaps `slot`.
fn collision(
    slot: TimeInterval,
    task_id: &str,
    current: &[Task],
    context: &SchedulingContext,
) -> Option<String> {
    smart_scheduler::blocked_intervals_for_day(
        slot.start.date(),
        current,
        &[task_id],
        &context.habits,
        &context.calendar_events,
    )
    .into_iter()
    .find(|blocked| blocked.interval.overlaps(&slot))
    .map(|blocked| blocked.source.to_string())
}

fn describe_slot(slot: TimeInterval) -> String {
    format!(
        "{} {}-{}",
        slot.start.format("%a %Y-%m-%d"),
        slot.start.format("%H:%M"),
        slot.end.format("%H:%M")
    )
}

fn single_slot_preview(task: &Task, slot: TimeInterval) -> GeneratedSchedule {
    GeneratedSchedule {
        days: vec![SchedulePreview {
            date: slot.start.date(),
            slots: vec![ScheduledSlot {
                task_id: task.id.clone(),
                task_title: task.title.clone(),
                start: slot.start,
                end: slot.end,
            }],
        }],
        ..GeneratedSchedule::default()
    }
}
