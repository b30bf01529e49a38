use chrono::{Duration, NaiveDate, NaiveDateTime, Weekday};
use smart_scheduler_lib::db::DbPool;
use smart_scheduler_lib::models::capacity::CapacityStatus;
use smart_scheduler_lib::models::schedule::{
    CalendarEvent, HabitBlock, MinuteWindow, TimeInterval, WorkingSchedule,
};
use smart_scheduler_lib::models::scheduler::{SchedulerConfig, WarningKind};
use smart_scheduler_lib::models::task::{Task, TaskFilter, TaskPatch, TaskPriority};
use smart_scheduler_lib::services::smart_scheduler::blocked_intervals_for_day;
use smart_scheduler_lib::services::task_store::{SqliteTaskStore, TaskStore};
use smart_scheduler_lib::{
    apply_schedule_preview, calculate_day_capacity, generate_smart_schedule, unschedule_all_tasks,
};
use tempfile::tempdir;

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 3).expect("monday")
}

fn at(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, minute, 0).expect("time")
}

fn task(id: &str, minutes: i64) -> Task {
    let mut task = Task::new(id, format!("Task {id}"));
    task.estimated_minutes = minutes;
    task
}

fn nine_to_five() -> WorkingSchedule {
    WorkingSchedule::from_hours("09:00", "17:00").expect("schedule")
}

fn sqlite_store() -> (tempfile::TempDir, SqliteTaskStore) {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("scheduler.sqlite")).expect("db pool");
    (dir, SqliteTaskStore::new(pool))
}

#[tokio::test]
async fn balanced_day_is_generated_applied_and_measured() {
    let (_dir, store) = sqlite_store();
    for id in ["a", "b", "c"] {
        store.insert_task(task(id, 120)).await.expect("insert");
    }

    let tasks = store.list_tasks(&TaskFilter::all()).await.expect("list");
    let config = SchedulerConfig::new(monday(), monday(), monday());
    let schedule = generate_smart_schedule(&tasks, &config, &nine_to_five(), &[], &[], &[]);

    assert_eq!(schedule.days.len(), 1);
    let starts = schedule.days[0]
        .slots
        .iter()
        .map(|slot| (slot.start, slot.end))
        .collect::<Vec<_>>();
    assert_eq!(
        starts,
        vec![
            (at(monday(), 9, 0), at(monday(), 11, 0)),
            (at(monday(), 11, 0), at(monday(), 13, 0)),
            (at(monday(), 13, 0), at(monday(), 15, 0)),
        ]
    );

    let written = apply_schedule_preview(&store, &schedule.days).await.expect("apply");
    assert_eq!(written, 3);

    let stored = store.list_tasks(&TaskFilter::all()).await.expect("list");
    let capacity = calculate_day_capacity(monday(), &stored, &nine_to_five(), &[]);
    assert_eq!(capacity.available_minutes, 480);
    assert_eq!(capacity.total_minutes_scheduled, 360);
    assert!((capacity.utilization_percentage - 75.0).abs() < f64::EPSILON);
    assert_eq!(capacity.status, CapacityStatus::Busy);
}

#[tokio::test]
async fn applying_a_preview_twice_is_idempotent() {
    let (_dir, store) = sqlite_store();
    store.insert_task(task("a", 60)).await.expect("insert");
    store.insert_task(task("b", 90)).await.expect("insert");

    let tasks = store.list_tasks(&TaskFilter::all()).await.expect("list");
    let config = SchedulerConfig::new(monday(), monday() + Duration::days(4), monday());
    let schedule = generate_smart_schedule(&tasks, &config, &nine_to_five(), &[], &[], &[]);

    apply_schedule_preview(&store, &schedule.days).await.expect("first apply");
    let once = store.list_tasks(&TaskFilter::all()).await.expect("list");
    apply_schedule_preview(&store, &schedule.days).await.expect("second apply");
    let twice = store.list_tasks(&TaskFilter::all()).await.expect("list");

    assert_eq!(once, twice);
    assert!(twice.iter().all(Task::is_placed));
}

#[tokio::test]
async fn unschedule_clears_exactly_the_range() {
    let (_dir, store) = sqlite_store();
    let placements = [
        ("before", monday() - Duration::days(1)),
        ("first", monday()),
        ("last", monday() + Duration::days(2)),
        ("after", monday() + Duration::days(3)),
    ];
    for (id, date) in placements {
        let mut task = task(id, 60);
        task.apply_patch(&TaskPatch::schedule(at(date, 10, 0), at(date, 11, 0)));
        store.insert_task(task).await.expect("insert");
    }
    store.insert_task(task("loose", 60)).await.expect("insert");

    let tasks = store.list_tasks(&TaskFilter::all()).await.expect("list");
    let cleared = unschedule_all_tasks(&store, &tasks, monday(), monday() + Duration::days(2))
        .await
        .expect("unschedule");
    assert_eq!(cleared, 2);

    let after = store.list_tasks(&TaskFilter::all()).await.expect("list");
    let placed = after
        .iter()
        .filter(|task| task.is_placed())
        .map(|task| task.id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(placed, vec!["before", "after"]);
}

#[test]
fn busy_week_never_double_books() {
    let schedule = nine_to_five().with_lunch(MinuteWindow::new(12 * 60, 13 * 60));
    let habits = vec![HabitBlock {
        id: "walk".into(),
        title: "Walk".into(),
        days_of_week: vec![Weekday::Mon, Weekday::Wed],
        start_minute: Some(15 * 60),
        estimated_minutes: Some(30),
        active: true,
    }];
    let events = vec![CalendarEvent {
        id: "review".into(),
        title: Some("Design review".into()),
        start: at(monday() + Duration::days(1), 9, 30),
        end: at(monday() + Duration::days(1), 11, 0),
    }];

    let mut tasks = (0..14)
        .map(|i| {
            let mut task = task(&format!("t{i}"), 30 + (i % 4) * 45);
            task.priority = match i % 3 {
                0 => TaskPriority::High,
                1 => TaskPriority::Medium,
                _ => TaskPriority::Low,
            };
            if i % 5 == 0 {
                task.due_date = Some(monday() + Duration::days(i / 2));
            }
            task
        })
        .collect::<Vec<_>>();
    let mut fixed = task("fixed", 60);
    fixed.apply_patch(&TaskPatch::schedule(
        at(monday() + Duration::days(2), 9, 0),
        at(monday() + Duration::days(2), 10, 0),
    ));
    tasks.push(fixed);

    let mut config = SchedulerConfig::new(monday(), monday() + Duration::days(6), monday());
    config.breaks_between_tasks = 10;
    config.deadline_buffer_days = 0;

    let generated = generate_smart_schedule(&tasks, &config, &schedule, &[], &habits, &events);
    let again = generate_smart_schedule(&tasks, &config, &schedule, &[], &habits, &events);
    assert_eq!(generated, again);
    assert!(generated.slot_count() > 0);

    for day in &generated.days {
        let mut blocked = blocked_intervals_for_day(day.date, &tasks, &[], &habits, &events)
            .into_iter()
            .map(|blocked| blocked.interval)
            .collect::<Vec<_>>();
        blocked.push(MinuteWindow::new(12 * 60, 13 * 60).on(day.date));

        let slots = day
            .slots
            .iter()
            .map(|slot| TimeInterval::new(slot.start, slot.end))
            .collect::<Vec<_>>();
        for (index, slot) in slots.iter().enumerate() {
            for other in &slots[index + 1..] {
                assert!(!slot.overlaps(other), "{slot:?} overlaps {other:?}");
            }
            for block in &blocked {
                assert!(!slot.overlaps(block), "{slot:?} overlaps blocked {block:?}");
            }
        }
    }

    for task_id in &generated.unplaced_task_ids {
        assert!(generated.warnings.iter().any(|w| w.task_id.as_ref() == Some(task_id)));
    }
}

#[test]
fn strict_deadline_beyond_capacity_is_reported() {
    let mut big = task("big", 600);
    big.due_date = Some(monday() + Duration::days(1));

    let mut config = SchedulerConfig::new(monday(), monday() + Duration::days(6), monday());
    config.strict_deadlines = true;
    config.deadline_buffer_days = 0;

    let generated = generate_smart_schedule(&[big], &config, &nine_to_five(), &[], &[], &[]);
    assert_eq!(generated.slot_count(), 0);
    assert!(generated.has_warning_for("big", WarningKind::InfeasibleDeadline));
    assert!(generated
        .warnings
        .iter()
        .any(|warning| warning.message.contains("deadline cannot be met")));
}

#[test]
fn strict_placements_stay_before_the_buffer() {
    let tasks = (0..6)
        .map(|i| {
            let mut task = task(&format!("d{i}"), 180);
            task.due_date = Some(monday() + Duration::days(3));
            task
        })
        .collect::<Vec<_>>();

    let mut config = SchedulerConfig::new(monday(), monday() + Duration::days(6), monday());
    config.strict_deadlines = true;
    config.deadline_buffer_days = 1;

    let generated = generate_smart_schedule(&tasks, &config, &nine_to_five(), &[], &[], &[]);
    let last_safe = monday() + Duration::days(2);
    for slot in generated.slots() {
        assert!(slot.start.date() <= last_safe, "{} placed on {}", slot.task_id, slot.start);
    }
    for task in &tasks {
        assert!(
            generated.slot_for(&task.id).is_some()
                || generated.has_warning_for(&task.id, WarningKind::InfeasibleDeadline)
        );
    }
}
