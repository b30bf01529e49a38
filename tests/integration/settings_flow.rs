use chrono::{NaiveDate, Weekday};
use smart_scheduler_lib::db::{migrations, DbPool};
use smart_scheduler_lib::models::command::{
    CommandScope, CommandType, SchedulingCommand, SchedulingSession,
};
use smart_scheduler_lib::models::scheduler::{IntensityMode, SchedulerConfig};
use smart_scheduler_lib::models::task::Task;
use smart_scheduler_lib::services::command_service::{build_context, SchedulingCommandService};
use smart_scheduler_lib::services::settings_service::SchedulingSettingsService;
use smart_scheduler_lib::services::task_store::{InMemoryTaskStore, StaticIntervalProvider, TaskStore};
use std::sync::Arc;
use tempfile::tempdir;

const PROFILE: &str = r#"
workingHours:
  start: "08:00"
  end: "12:00"
  workingDays: [Mon, Tue, Wed, Thu]
  holidays: ["2025-03-04"]
defaults:
  intensityMode: intense
  deadlineBufferDays: 0
  breaksBetweenTasks: 15
"#;

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 3).expect("monday")
}

#[test]
fn profile_survives_reopening_the_database() {
    let dir = tempdir().expect("temp dir");
    let db_path = dir.path().join("nested").join("settings.sqlite");

    {
        let pool = DbPool::new(&db_path).expect("db pool");
        let service = SchedulingSettingsService::new(pool);
        service.import_profile_yaml(PROFILE).expect("import");
    }

    let pool = DbPool::new(&db_path).expect("reopen");
    let history = pool
        .with_connection(|conn| migrations::get_migration_history(conn))
        .expect("history");
    assert!(history.iter().any(|entry| entry.version == 2));

    let service = SchedulingSettingsService::new(pool);
    let profile = service.get_profile().expect("profile");
    assert_eq!(profile.working_schedule.start_minute, 8 * 60);
    assert_eq!(profile.working_schedule.working_days.len(), 4);
    assert!(!profile.working_schedule.working_days.contains(&Weekday::Fri));
    assert_eq!(profile.defaults.intensity_mode, IntensityMode::Intense);
    assert_eq!(profile.defaults.breaks_between_tasks, 15);

    let config = SchedulerConfig::with_defaults(monday(), monday(), monday(), &profile.defaults);
    assert_eq!(config.deadline_buffer_days, 0);
    assert!((config.focus_project_ratio - 0.7).abs() < f64::EPSILON);
}

#[tokio::test]
async fn stored_profile_drives_command_placement() {
    let dir = tempdir().expect("temp dir");
    let settings =
        SchedulingSettingsService::new(DbPool::new(dir.path().join("settings.sqlite")).expect("db"));
    settings.import_profile_yaml(PROFILE).expect("import");

    let store = Arc::new(InMemoryTaskStore::default());
    for id in ["a", "b", "c"] {
        let mut task = Task::new(id, format!("Task {id}"));
        task.estimated_minutes = 60;
        store.insert_task(task).await.expect("insert");
    }

    let context = build_context(
        "user-1",
        monday().and_hms_opt(7, 0, 0).expect("now"),
        store.as_ref(),
        &StaticIntervalProvider::default(),
        settings.get_profile().expect("profile"),
    )
    .await
    .expect("context");

    let service = SchedulingCommandService::new(store.clone());
    let mut session = SchedulingSession::new();
    service
        .execute(
            &mut session,
            SchedulingCommand::new(CommandType::ScheduleUnscheduled, CommandScope::Week)
                .with_target_date(monday()),
            &context,
        )
        .await
        .expect("execute");

    // 4h day at 90% leaves 216 minutes: three hours plus two breaks fit.
    let preview = session.preview().expect("preview");
    assert_eq!(preview.days.len(), 1);
    assert_eq!(preview.days[0].date, monday());
    let starts = preview.days[0]
        .slots
        .iter()
        .map(|slot| slot.start.format("%H:%M").to_string())
        .collect::<Vec<_>>();
    assert_eq!(starts, vec!["08:00", "09:15", "10:30"]);
}

#[test]
fn rejected_yaml_keeps_previous_profile() {
    let dir = tempdir().expect("temp dir");
    let service =
        SchedulingSettingsService::new(DbPool::new(dir.path().join("settings.sqlite")).expect("db"));
    service.import_profile_yaml(PROFILE).expect("import");

    let broken = r#"
workingHours:
  start: "17:00"
  end: "09:00"
"#;
    assert!(service.import_profile_yaml(broken).is_err());

    service.invalidate_cache();
    let schedule = service.get_working_schedule().expect("schedule");
    assert_eq!(schedule.start_minute, 8 * 60);
    assert_eq!(schedule.end_minute, 12 * 60);
}
