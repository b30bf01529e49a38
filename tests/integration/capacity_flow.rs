use chrono::{Duration, NaiveDate, NaiveDateTime};
use smart_scheduler_lib::db::DbPool;
use smart_scheduler_lib::models::capacity::CapacityStatus;
use smart_scheduler_lib::models::schedule::{MinuteWindow, WorkingSchedule};
use smart_scheduler_lib::models::scheduler::{IntensityMode, SchedulerConfig};
use smart_scheduler_lib::models::task::{Task, TaskFilter, TaskPatch, TaskStatus};
use smart_scheduler_lib::services::capacity_insights::{
    calculate_buffer_recommendation, capacity_display, find_schedule_gaps, weekly_summary,
};
use smart_scheduler_lib::services::task_store::{SqliteTaskStore, TaskStore};
use smart_scheduler_lib::{analyze_schedule, calculate_week_capacity};
use tempfile::tempdir;

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 3).expect("monday")
}

fn at(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, minute, 0).expect("time")
}

fn booked(id: &str, date: NaiveDate, start_hour: u32, minutes: i64) -> Task {
    let mut task = Task::new(id, format!("Task {id}"));
    task.estimated_minutes = minutes;
    let start = at(date, start_hour, 0);
    task.apply_patch(&TaskPatch::schedule(start, start + Duration::minutes(minutes)));
    task
}

fn schedule_with_lunch() -> WorkingSchedule {
    WorkingSchedule::from_hours("09:00", "17:00")
        .expect("schedule")
        .with_lunch(MinuteWindow::new(12 * 60, 13 * 60))
}

#[tokio::test]
async fn week_capacity_from_persisted_tasks() {
    let dir = tempdir().expect("temp dir");
    let store = SqliteTaskStore::new(DbPool::new(dir.path().join("capacity.sqlite")).expect("db"));

    let wednesday = monday() + Duration::days(2);
    store.insert_task(booked("m1", monday(), 9, 180)).await.expect("insert");
    store.insert_task(booked("m2", monday(), 13, 240)).await.expect("insert");
    store.insert_task(booked("w1", wednesday, 9, 60)).await.expect("insert");

    let tasks = store.list_tasks(&TaskFilter::all()).await.expect("list");
    let holidays = [monday() + Duration::days(4)];
    let week = calculate_week_capacity(monday(), &tasks, &schedule_with_lunch(), &holidays);

    assert_eq!(week.len(), 7);
    assert_eq!(week[0].available_minutes, 420);
    assert_eq!(week[0].total_minutes_scheduled, 420);
    assert_eq!(week[0].status, CapacityStatus::Full);
    assert_eq!(week[1].status, CapacityStatus::Available);
    assert_eq!(week[2].task_count, 1);
    assert!(week[4].is_holiday);
    assert_eq!(week[4].available_minutes, 0);
    assert!(week[5].is_weekend && week[6].is_weekend);

    let summary = weekly_summary(monday(), &tasks, &schedule_with_lunch(), &holidays);
    assert_eq!(summary.busiest_day, Some(monday()));
    assert_eq!(summary.lightest_day, Some(monday() + Duration::days(1)));
    assert_eq!(summary.total_available_minutes, 4 * 420);
    assert_eq!(capacity_display(week[0].utilization_percentage).label, "Full");

    let gaps = find_schedule_gaps(monday(), &tasks, &schedule_with_lunch(), &holidays, Some(7));
    let dates = gaps.gaps.iter().map(|gap| gap.date).collect::<Vec<_>>();
    assert_eq!(
        dates,
        vec![
            monday() + Duration::days(1),
            wednesday,
            monday() + Duration::days(3)
        ]
    );
    assert!(gaps.can_fit(420));
    assert!(!gaps.can_fit(421));
}

#[test]
fn analysis_and_buffer_agree_with_history() {
    let mut history = (0..6)
        .map(|i| {
            let mut task = booked(&format!("done{i}"), monday() - Duration::days(7), 9, 60);
            task.status = TaskStatus::Completed;
            task.actual_minutes = Some(72);
            task
        })
        .collect::<Vec<_>>();

    let recommendation = calculate_buffer_recommendation(&history);
    assert_eq!(recommendation.sample_size, 6);
    assert_eq!(recommendation.recommended_buffer_percent, 25);

    let mut open = Task::new("open", "Write proposal");
    open.estimated_minutes = 240;
    open.due_date = Some(monday() + Duration::days(1));
    history.push(open);

    let mut config = SchedulerConfig::new(monday(), monday() + Duration::days(4), monday());
    config.intensity_mode = IntensityMode::Relaxed;
    config.deadline_buffer_days = 0;
    let analysis = analyze_schedule(&history, &config, &schedule_with_lunch());

    assert_eq!(analysis.total_tasks, 1);
    assert_eq!(analysis.total_minutes_needed, 240);
    assert_eq!(analysis.total_minutes_available, 5 * 252);
    assert_eq!(analysis.deadline_tasks.len(), 1);
    assert!(analysis.deadline_tasks[0].can_schedule);
    assert_eq!(analysis.deadline_tasks[0].days_until_due, 1);
}
