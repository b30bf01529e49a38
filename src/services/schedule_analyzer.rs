use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::models::analysis::{DeadlineTaskInsight, ScheduleAnalysis};
use crate::models::schedule::WorkingSchedule;
use crate::models::scheduler::{IntensityMode, SchedulerConfig};
use crate::models::task::Task;
use crate::services::capacity_service;
use crate::services::schedule_utils;

const LOW_UTILIZATION_PERCENT: i64 = 40;
const HIGH_UTILIZATION_PERCENT: i64 = 90;

/// Read-only feasibility report for the configured range. Never writes and
/// never changes the config it is given.
pub fn analyze_schedule(
    tasks: &[Task],
    config: &SchedulerConfig,
    working_schedule: &WorkingSchedule,
) -> ScheduleAnalysis {
    let budgets = daily_budgets(config, working_schedule);
    let total_minutes_available: i64 = budgets.values().sum();
    let working_days = budgets.values().filter(|budget| **budget > 0).count();

    let open_tasks = tasks
        .iter()
        .filter(|task| !task.is_completed())
        .collect::<Vec<_>>();
    let schedulable = open_tasks
        .iter()
        .copied()
        .filter(|task| task.estimated_minutes > 0)
        .collect::<Vec<_>>();

    // Placed tasks already hold their time; only unplaced work still needs room.
    let total_minutes_needed: i64 = schedulable
        .iter()
        .filter(|task| task.scheduled_start.is_none())
        .map(|task| task.estimated_minutes)
        .sum();

    let utilization_percent = if total_minutes_available > 0 {
        (total_minutes_needed as f64 / total_minutes_available as f64 * 100.0).round() as i64
    } else {
        0
    };

    let deadline_tasks = deadline_insights(&schedulable, config, &budgets, tasks);

    let mut warnings = Vec::new();
    if utilization_percent > 100 {
        warnings.push(format!(
            "scheduled load exceeds available capacity by {}%",
            utilization_percent - 100
        ));
    }
    if total_minutes_available == 0 && total_minutes_needed > 0 {
        warnings.push(format!(
            "no working time between {} and {}",
            config.start_date, config.end_date
        ));
    }
    for insight in &deadline_tasks {
        if insight.days_until_due < 0 {
            warnings.push(format!(
                "'{}' is overdue by {} day(s)",
                insight.title, -insight.days_until_due
            ));
        } else if !insight.can_schedule {
            warnings.push(format!(
                "'{}' ({} min) cannot be scheduled before its deadline {}",
                insight.title, insight.estimated_minutes, insight.due_date
            ));
        }
        if config.strict_deadlines
            && insight.days_until_due >= 0
            && config.last_safe_day(insight.due_date) < config.today
        {
            warnings.push(format!(
                "'{}' has no slack left: a {}-day buffer before {} ends before today",
                insight.title, config.deadline_buffer_days, insight.due_date
            ));
        }
    }

    let at_risk = deadline_tasks.iter().filter(|task| !task.can_schedule).count();
    let recommendations = build_recommendations(config, utilization_percent, at_risk);

    debug!(
        target: "app::analyzer",
        needed = total_minutes_needed,
        available = total_minutes_available,
        utilization = utilization_percent,
        at_risk,
        "analysis computed"
    );
    info!(
        target: "app::analyzer",
        start = %config.start_date,
        end = %config.end_date,
        tasks = schedulable.len(),
        warnings = warnings.len(),
        "schedule analyzed"
    );

    ScheduleAnalysis {
        start_date: config.start_date,
        end_date: config.end_date,
        total_tasks: open_tasks.len(),
        schedulable_tasks: schedulable.len(),
        total_minutes_needed,
        total_minutes_available,
        utilization_percent,
        working_days,
        deadline_tasks,
        warnings,
        recommendations,
    }
}

/// Fillable minutes per date, using the same intensity and overtime rules
/// the scheduler applies.
fn daily_budgets(
    config: &SchedulerConfig,
    working_schedule: &WorkingSchedule,
) -> BTreeMap<NaiveDate, i64> {
    let lunch = config.lunch_break.or(working_schedule.lunch_break);
    let overtime_in_regular =
        config.allow_overtime && config.intensity_mode == IntensityMode::DeadlineDriven;

    schedule_utils::date_range(config.start_date, config.end_date)
        .map(|date| {
            let available =
                capacity_service::available_minutes(date, working_schedule, lunch.as_ref(), &[]);
            let mut budget =
                (available as f64 * config.intensity_mode.capacity_fraction()).floor() as i64;
            if available > 0 && overtime_in_regular {
                budget += config.overtime_minutes();
            }
            if let Some(cap) = config.max_minutes_per_day {
                budget = budget.min(cap.max(0));
            }
            (date, budget)
        })
        .collect()
}

/// Walks tasks due inside the range in deadline order. Each one draws on
/// the free minutes of the days from `max(start, today)` up to its last safe
/// day; it is feasible when those minutes, summed in date order, cover its
/// estimate.
fn deadline_insights(
    schedulable: &[&Task],
    config: &SchedulerConfig,
    budgets: &BTreeMap<NaiveDate, i64>,
    all_tasks: &[Task],
) -> Vec<DeadlineTaskInsight> {
    let first_day = config.start_date.max(config.today);
    let mut free = budgets
        .iter()
        .filter(|(date, _)| **date >= first_day)
        .map(|(date, budget)| {
            let booked: i64 = all_tasks
                .iter()
                .filter(|task| task.scheduled_on(*date))
                .map(Task::placed_minutes)
                .sum();
            (*date, (*budget - booked).max(0))
        })
        .collect::<BTreeMap<_, _>>();

    let mut dated = schedulable
        .iter()
        .copied()
        .enumerate()
        .filter_map(|(index, task)| task.due_date.map(|due| (index, due, task)))
        .filter(|(_, due, _)| *due >= config.start_date && *due <= config.end_date)
        .collect::<Vec<_>>();
    dated.sort_by(|(a_idx, a_due, a), (b_idx, b_due, b)| {
        a_due
            .cmp(b_due)
            .then_with(|| b.priority.rank().cmp(&a.priority.rank()))
            .then_with(|| a_idx.cmp(b_idx))
    });

    dated
        .into_iter()
        .map(|(_, due, task)| {
            let last_day = config.last_safe_day(due);
            let is_scheduled = task.scheduled_start.is_some();
            let can_schedule = match task.scheduled_start {
                Some(start) => start.date() <= last_day,
                None => consume_until(&mut free, last_day, task.estimated_minutes),
            };

            DeadlineTaskInsight {
                task_id: task.id.clone(),
                title: task.title.clone(),
                priority: task.priority,
                due_date: due,
                estimated_minutes: task.estimated_minutes,
                days_until_due: schedule_utils::days_between(config.today, due),
                can_schedule,
                is_scheduled,
            }
        })
        .collect()
}

/// Takes `minutes` from the free days up to `last_day`, earliest first.
/// Leaves `free` untouched when the total falls short.
fn consume_until(free: &mut BTreeMap<NaiveDate, i64>, last_day: NaiveDate, minutes: i64) -> bool {
    let available: i64 = free.range(..=last_day).map(|(_, left)| *left).sum();
    if available < minutes {
        return false;
    }

    let mut remaining = minutes;
    for (_, left) in free.range_mut(..=last_day) {
        if remaining == 0 {
            break;
        }
        let taken = remaining.min(*left);
        *left -= taken;
        remaining -= taken;
    }
    true
}

fn build_recommendations(
    config: &SchedulerConfig,
    utilization_percent: i64,
    at_risk: usize,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if utilization_percent < LOW_UTILIZATION_PERCENT {
        if let Some(lighter) = config.intensity_mode.relaxed_step() {
            recommendations.push(format!(
                "Load is light; the {lighter} intensity mode would leave more breathing room"
            ));
        }
    }

    if utilization_percent > 100 || at_risk > 0 {
        if !config.allow_overtime {
            recommendations.push("Allow overtime to gain extra minutes on working days".to_string());
        }
        recommendations.push("Extend the date range or defer low-priority tasks".to_string());
    }

    if utilization_percent > HIGH_UTILIZATION_PERCENT
        && config.intensity_mode != IntensityMode::DeadlineDriven
    {
        recommendations.push(
            "Switch to deadline-driven mode to use the full working day".to_string(),
        );
    }

    if at_risk > 0 && !config.strict_deadlines {
        recommendations.push(format!(
            "{at_risk} task(s) may miss their deadline; enable strict deadlines to prioritize them"
        ));
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).expect("monday")
    }

    fn task(id: &str, minutes: i64) -> Task {
        let mut task = Task::new(id, format!("Task {id}"));
        task.estimated_minutes = minutes;
        task
    }

    fn week() -> SchedulerConfig {
        SchedulerConfig::new(monday(), monday() + Duration::days(6), monday())
    }

    fn nine_to_five() -> WorkingSchedule {
        WorkingSchedule::from_hours("09:00", "17:00").expect("schedule")
    }

    #[test]
    fn empty_pool_is_feasible() {
        let analysis = analyze_schedule(&[], &week(), &nine_to_five());
        assert_eq!(analysis.total_tasks, 0);
        assert_eq!(analysis.working_days, 5);
        assert_eq!(analysis.total_minutes_available, 5 * 360);
        assert_eq!(analysis.utilization_percent, 0);
        assert!(analysis.is_feasible());
        assert!(analysis.warnings.is_empty());
    }

    #[test]
    fn over_capacity_is_reported_not_rejected() {
        let tasks = (0..10).map(|i| task(&format!("t{i}"), 240)).collect::<Vec<_>>();
        let analysis = analyze_schedule(&tasks, &week(), &nine_to_five());

        assert_eq!(analysis.total_minutes_needed, 2400);
        assert_eq!(analysis.utilization_percent, 133);
        assert!(analysis
            .warnings
            .iter()
            .any(|warning| warning.contains("exceeds available capacity by 33%")));
        assert!(analysis
            .recommendations
            .iter()
            .any(|text| text.contains("overtime")));
        assert!(!analysis.is_feasible());
    }

    #[test]
    fn completed_and_invalid_tasks_are_excluded() {
        let mut done = task("done", 60);
        done.status = crate::models::task::TaskStatus::Completed;
        let tasks = vec![done, task("zero", 0), task("ok", 60)];

        let analysis = analyze_schedule(&tasks, &week(), &nine_to_five());
        assert_eq!(analysis.total_tasks, 2);
        assert_eq!(analysis.schedulable_tasks, 1);
        assert_eq!(analysis.total_minutes_needed, 60);
    }

    #[test]
    fn deadline_feasibility_sums_free_time_across_days() {
        let mut config = week();
        config.deadline_buffer_days = 0;
        let mut big = task("big", 600);
        big.due_date = Some(monday() + Duration::days(1));

        let analysis = analyze_schedule(&[big], &config, &nine_to_five());
        assert_eq!(analysis.deadline_tasks.len(), 1);
        assert!(analysis.deadline_tasks[0].can_schedule);
        assert_eq!(analysis.deadline_tasks[0].days_until_due, 1);
    }

    #[test]
    fn oversized_deadline_task_is_at_risk() {
        let mut config = week();
        config.deadline_buffer_days = 0;
        let mut big = task("big", 800);
        big.due_date = Some(monday() + Duration::days(1));
        let mut small = task("small", 60);
        small.due_date = Some(monday() + Duration::days(3));

        let analysis = analyze_schedule(&[big, small], &config, &nine_to_five());
        let risky = analysis.at_risk_tasks().map(|t| t.task_id.as_str()).collect::<Vec<_>>();
        assert_eq!(risky, vec!["big"]);
        assert!(analysis
            .warnings
            .iter()
            .any(|warning| warning.contains("cannot be scheduled before its deadline")));
    }

    #[test]
    fn earlier_deadlines_use_up_shared_days() {
        let mut config = week();
        config.deadline_buffer_days = 0;
        let mut first = task("first", 500);
        first.due_date = Some(monday() + Duration::days(1));
        let mut second = task("second", 300);
        second.due_date = Some(monday() + Duration::days(1));

        let analysis = analyze_schedule(&[first, second], &config, &nine_to_five());
        let verdicts = analysis
            .deadline_tasks
            .iter()
            .map(|insight| (insight.task_id.as_str(), insight.can_schedule))
            .collect::<Vec<_>>();
        assert_eq!(verdicts, vec![("first", true), ("second", false)]);
    }

    #[test]
    fn deadline_capacity_is_consumed_in_due_order() {
        let mut config = week();
        config.deadline_buffer_days = 0;
        let mut first = task("first", 300);
        first.due_date = Some(monday());
        let mut second = task("second", 300);
        second.due_date = Some(monday());

        let analysis = analyze_schedule(&[second.clone(), first], &config, &nine_to_five());
        let verdicts = analysis
            .deadline_tasks
            .iter()
            .map(|insight| insight.can_schedule)
            .collect::<Vec<_>>();
        assert_eq!(verdicts, vec![true, false]);
        assert_eq!(analysis.deadline_tasks[0].task_id, second.id);
    }

    #[test]
    fn buffer_applies_without_strict_deadlines() {
        let config = week();
        assert!(!config.strict_deadlines);
        assert_eq!(config.deadline_buffer_days, 2);
        let mut soon = task("soon", 30);
        soon.due_date = Some(monday() + Duration::days(1));

        let analysis = analyze_schedule(&[soon], &config, &nine_to_five());
        assert!(!analysis.deadline_tasks[0].can_schedule);
        assert!(!analysis.warnings.iter().any(|warning| warning.contains("no slack")));
    }

    #[test]
    fn deadlines_outside_the_range_are_not_listed() {
        let mut far = task("far", 60);
        far.due_date = Some(monday() + Duration::days(40));
        let mut before = task("before", 60);
        before.due_date = Some(monday() - Duration::days(3));

        let analysis = analyze_schedule(&[far, before], &week(), &nine_to_five());
        assert!(analysis.deadline_tasks.is_empty());
        assert_eq!(analysis.total_minutes_needed, 120);
    }

    #[test]
    fn placed_tasks_do_not_count_as_needed() {
        let mut placed = task("placed", 60);
        placed.scheduled_start = Some(monday().and_hms_opt(9, 0, 0).expect("start"));
        placed.scheduled_end = Some(monday().and_hms_opt(10, 0, 0).expect("end"));

        let analysis = analyze_schedule(&[placed, task("open", 45)], &week(), &nine_to_five());
        assert_eq!(analysis.schedulable_tasks, 2);
        assert_eq!(analysis.total_minutes_needed, 45);
    }

    #[test]
    fn strict_buffer_in_the_past_is_flagged() {
        let mut config = week();
        config.strict_deadlines = true;
        config.deadline_buffer_days = 2;
        let mut soon = task("soon", 30);
        soon.due_date = Some(monday() + Duration::days(1));

        let analysis = analyze_schedule(&[soon], &config, &nine_to_five());
        assert!(analysis.warnings.iter().any(|warning| warning.contains("no slack")));
        assert!(!analysis.deadline_tasks[0].can_schedule);
    }

    #[test]
    fn light_load_suggests_lower_intensity() {
        let mut config = week();
        config.intensity_mode = IntensityMode::Intense;
        let analysis = analyze_schedule(&[task("a", 30)], &config, &nine_to_five());
        assert!(analysis
            .recommendations
            .iter()
            .any(|text| text.contains("balanced")));
    }

    #[test]
    fn analysis_does_not_touch_config() {
        let config = week();
        let snapshot = config.clone();
        let _ = analyze_schedule(&[task("a", 30)], &config, &nine_to_five());
        assert_eq!(config, snapshot);
    }
}
