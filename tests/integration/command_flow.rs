use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDate, NaiveDateTime, Weekday};
use smart_scheduler_lib::db::DbPool;
use smart_scheduler_lib::models::command::{
    CommandOptions, CommandScope, CommandType, SchedulingCommand, SchedulingSession, SessionStatus,
};
use smart_scheduler_lib::models::schedule::{CalendarEvent, HabitBlock};
use smart_scheduler_lib::models::settings::SchedulingProfile;
use smart_scheduler_lib::models::task::{Task, TaskFilter, TaskPatch, TaskPriority};
use smart_scheduler_lib::services::command_service::{build_context, SchedulingCommandService};
use smart_scheduler_lib::services::task_store::{
    SqliteTaskStore, StaticIntervalProvider, TaskChange, TaskStore,
};
use tempfile::tempdir;

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 3).expect("monday")
}

fn at(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, minute, 0).expect("time")
}

fn task(id: &str, minutes: i64, priority: TaskPriority) -> Task {
    let mut task = Task::new(id, format!("Task {id}"));
    task.estimated_minutes = minutes;
    task.priority = priority;
    task
}

fn provider() -> StaticIntervalProvider {
    StaticIntervalProvider::new(
        vec![HabitBlock {
            id: "gym".into(),
            title: "Gym".into(),
            days_of_week: vec![Weekday::Mon],
            start_minute: Some(9 * 60),
            estimated_minutes: Some(60),
            active: true,
        }],
        vec![CalendarEvent {
            id: "sync".into(),
            title: Some("Team sync".into()),
            start: at(monday(), 11, 0),
            end: at(monday(), 12, 0),
        }],
    )
}

struct Harness {
    _dir: tempfile::TempDir,
    store: Arc<SqliteTaskStore>,
    service: SchedulingCommandService,
}

fn harness() -> Harness {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("commands.sqlite")).expect("db pool");
    let store = Arc::new(SqliteTaskStore::new(pool));
    let service = SchedulingCommandService::new(store.clone());
    Harness {
        _dir: dir,
        store,
        service,
    }
}

#[tokio::test]
async fn schedule_confirm_and_notify() {
    let h = harness();
    h.store
        .insert_task(task("report", 60, TaskPriority::High))
        .await
        .expect("insert");
    h.store
        .insert_task(task("email", 30, TaskPriority::Low))
        .await
        .expect("insert");

    let changes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&changes);
    let subscription = h.store.subscribe(Arc::new(move |change: &TaskChange| {
        if let TaskChange::Updated(task) = change {
            sink.lock().expect("lock").push(task.id.clone());
        }
    }));

    let context = build_context(
        "user-1",
        at(monday(), 8, 0),
        h.store.as_ref(),
        &provider(),
        SchedulingProfile::default(),
    )
    .await
    .expect("context");
    assert_eq!(context.tasks.len(), 2);
    assert_eq!(context.habits.len(), 1);

    let mut session = SchedulingSession::new();
    let result = h
        .service
        .execute(
            &mut session,
            SchedulingCommand::new(CommandType::ScheduleUnscheduled, CommandScope::Day)
                .with_target_date(monday()),
            &context,
        )
        .await
        .expect("execute");
    assert!(result.requires_confirmation);
    assert!(changes.lock().expect("lock").is_empty());

    let preview = session.preview().expect("preview").clone();
    assert_eq!(preview.slot_for("report").map(|slot| slot.start), Some(at(monday(), 10, 0)));
    assert_eq!(preview.slot_for("email").map(|slot| slot.start), Some(at(monday(), 12, 0)));

    let confirmed = h.service.confirm(&mut session).await.expect("confirm");
    assert!(confirmed.success);
    assert_eq!(session.status, SessionStatus::Applied);
    assert_eq!(changes.lock().expect("lock").len(), 2);

    subscription.unsubscribe();
    h.store
        .update_task("email", TaskPatch::clear_schedule())
        .await
        .expect("update");
    assert_eq!(changes.lock().expect("lock").len(), 2);

    let report = h.store.get_task("report").await.expect("get").expect("report");
    assert_eq!(report.scheduled_start, Some(at(monday(), 10, 0)));
    assert_eq!(report.scheduled_end, Some(at(monday(), 11, 0)));
}

#[tokio::test]
async fn reschedule_period_keeps_in_progress_work() {
    let h = harness();
    let tuesday = monday() + Duration::days(1);

    let mut pinned = task("pinned", 60, TaskPriority::Medium);
    pinned.status = smart_scheduler_lib::models::task::TaskStatus::InProgress;
    pinned.apply_patch(&TaskPatch::schedule(at(tuesday, 14, 0), at(tuesday, 15, 0)));
    let mut loose = task("loose", 60, TaskPriority::Medium);
    loose.apply_patch(&TaskPatch::schedule(at(tuesday, 15, 0), at(tuesday, 16, 0)));
    h.store.insert_task(pinned).await.expect("insert");
    h.store.insert_task(loose).await.expect("insert");

    let context = build_context(
        "user-1",
        at(monday(), 8, 0),
        h.store.as_ref(),
        &StaticIntervalProvider::default(),
        SchedulingProfile::default(),
    )
    .await
    .expect("context");

    let mut session = SchedulingSession::new();
    let result = h
        .service
        .execute(
            &mut session,
            SchedulingCommand::new(CommandType::ReschedulePeriod, CommandScope::Week)
                .with_target_date(monday()),
            &context,
        )
        .await
        .expect("execute");
    assert!(result.success);

    let preview = session.preview().expect("preview");
    assert!(preview.slot_for("pinned").is_none());
    assert_eq!(preview.slot_for("loose").map(|slot| slot.start), Some(at(monday(), 9, 0)));

    h.service.confirm(&mut session).await.expect("confirm");
    let pinned = h.store.get_task("pinned").await.expect("get").expect("pinned");
    assert_eq!(pinned.scheduled_start, Some(at(tuesday, 14, 0)));
}

#[tokio::test]
async fn clear_then_cancel_leaves_tasks_alone() {
    let h = harness();
    let mut placed = task("placed", 60, TaskPriority::Medium);
    placed.apply_patch(&TaskPatch::schedule(at(monday(), 9, 0), at(monday(), 10, 0)));
    h.store.insert_task(placed).await.expect("insert");

    let context = build_context(
        "user-1",
        at(monday(), 8, 0),
        h.store.as_ref(),
        &StaticIntervalProvider::default(),
        SchedulingProfile::default(),
    )
    .await
    .expect("context");

    let mut session = SchedulingSession::new();
    let result = h
        .service
        .execute(
            &mut session,
            SchedulingCommand::new(CommandType::ClearSchedule, CommandScope::Week)
                .with_target_date(monday())
                .with_options(CommandOptions {
                    auto_apply: false,
                    ..CommandOptions::default()
                }),
            &context,
        )
        .await
        .expect("clear");
    assert!(result.requires_confirmation);

    assert!(h.service.cancel_pending(&mut session).success);
    assert!(!h.service.confirm(&mut session).await.expect("confirm").success);

    let scheduled = h
        .store
        .list_tasks(&TaskFilter {
            scheduled_between: Some((monday(), monday())),
            ..TaskFilter::default()
        })
        .await
        .expect("list");
    assert_eq!(scheduled.len(), 1);
}

#[tokio::test]
async fn emergency_insert_detects_concurrent_booking() {
    let h = harness();
    h.store
        .insert_task(task("hotfix", 60, TaskPriority::Urgent))
        .await
        .expect("insert");

    let context = build_context(
        "user-1",
        at(monday(), 8, 0),
        h.store.as_ref(),
        &provider(),
        SchedulingProfile::default(),
    )
    .await
    .expect("context");

    let mut rival = task("rival", 60, TaskPriority::Medium);
    rival.apply_patch(&TaskPatch::schedule(at(monday(), 10, 0), at(monday(), 11, 0)));
    h.store.insert_task(rival).await.expect("concurrent insert");

    let mut session = SchedulingSession::new();
    let command = SchedulingCommand::new(CommandType::EmergencyInsert, CommandScope::Day)
        .with_target_date(monday())
        .with_tasks(vec!["hotfix".into()]);

    let stale = h
        .service
        .execute(&mut session, command.clone(), &context)
        .await
        .expect("insert");
    assert!(!stale.success);
    assert!(stale.message.contains("task rival"));

    let fresh_context = build_context(
        "user-1",
        at(monday(), 8, 0),
        h.store.as_ref(),
        &provider(),
        SchedulingProfile::default(),
    )
    .await
    .expect("context");
    let retried = h
        .service
        .execute(&mut session, command, &fresh_context)
        .await
        .expect("insert");
    assert!(retried.success, "{}", retried.message);

    let hotfix = h.store.get_task("hotfix").await.expect("get").expect("hotfix");
    assert_eq!(hotfix.scheduled_start, Some(at(monday(), 12, 0)));
}

#[tokio::test]
async fn confirmed_reschedule_never_leaves_overlapping_slots() {
    let h = harness();
    let mut low = task("low", 120, TaskPriority::Low);
    low.apply_patch(&TaskPatch::schedule(at(monday(), 9, 0), at(monday(), 11, 0)));
    h.store.insert_task(low).await.expect("insert");
    for (i, hour) in [11, 13, 15].into_iter().enumerate() {
        let mut high = task(&format!("h{}", i + 1), 120, TaskPriority::High);
        high.apply_patch(&TaskPatch::schedule(at(monday(), hour, 0), at(monday(), hour + 2, 0)));
        h.store.insert_task(high).await.expect("insert");
    }

    let context = build_context(
        "user-1",
        at(monday(), 8, 0),
        h.store.as_ref(),
        &StaticIntervalProvider::default(),
        SchedulingProfile::default(),
    )
    .await
    .expect("context");

    let mut session = SchedulingSession::new();
    let result = h
        .service
        .execute(
            &mut session,
            SchedulingCommand::new(CommandType::ReschedulePeriod, CommandScope::Day)
                .with_target_date(monday()),
            &context,
        )
        .await
        .expect("execute");
    assert!(result.requires_confirmation);
    assert!(result.warnings.iter().any(|warning| warning.contains("will be cleared")));

    let confirmed = h.service.confirm(&mut session).await.expect("confirm");
    assert!(confirmed.success);
    assert_eq!(confirmed.affected_tasks, 4);

    let low = h.store.get_task("low").await.expect("get").expect("low");
    assert!(low.scheduled_start.is_none());
    assert!(low.scheduled_end.is_none());

    let placed = h
        .store
        .list_tasks(&TaskFilter::all())
        .await
        .expect("list")
        .into_iter()
        .filter_map(|task| Some((task.id.clone(), task.scheduled_start?, task.scheduled_end?)))
        .collect::<Vec<_>>();
    assert_eq!(placed.len(), 3);
    for (index, (id, start, end)) in placed.iter().enumerate() {
        for (other, other_start, other_end) in &placed[index + 1..] {
            assert!(end <= other_start || other_end <= start, "{id} overlaps {other}");
        }
    }
}
