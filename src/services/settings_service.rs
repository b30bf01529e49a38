use std::sync::RwLock;

use tracing::{info, warn};

use crate::db::repositories::settings_repository::SettingsRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::schedule::WorkingSchedule;
use crate::models::scheduler::SchedulerDefaults;
use crate::models::settings::{ProfileDocument, SchedulingProfile, WorkingHoursDocument};

const KEY_WORKING_SCHEDULE: &str = "working_schedule";
const KEY_SCHEDULER_DEFAULTS: &str = "scheduler_defaults";

/// Persisted working hours and scheduler defaults, cached after first read.
pub struct SchedulingSettingsService {
    db: DbPool,
    cache: RwLock<Option<SchedulingProfile>>,
}

impl SchedulingSettingsService {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            cache: RwLock::new(None),
        }
    }

    pub fn get_profile(&self) -> AppResult<SchedulingProfile> {
        if let Ok(guard) = self.cache.read() {
            if let Some(profile) = guard.as_ref() {
                return Ok(profile.clone());
            }
        }

        let profile = self.load_profile()?;
        self.store_cache(&profile);
        Ok(profile)
    }

    pub fn get_working_schedule(&self) -> AppResult<WorkingSchedule> {
        Ok(self.get_profile()?.working_schedule)
    }

    pub fn get_defaults(&self) -> AppResult<SchedulerDefaults> {
        Ok(self.get_profile()?.defaults)
    }

    pub fn update_working_schedule(&self, schedule: WorkingSchedule) -> AppResult<WorkingSchedule> {
        schedule.validate()?;
        self.db.with_connection(|conn| {
            SettingsRepository::put_json(conn, KEY_WORKING_SCHEDULE, &schedule)
        })?;

        let mut profile = self.get_profile()?;
        profile.working_schedule = schedule.clone();
        self.store_cache(&profile);

        info!(
            target: "app::settings",
            start = schedule.start_minute,
            end = schedule.end_minute,
            days = schedule.working_days.len(),
            "working schedule updated"
        );
        Ok(schedule)
    }

    pub fn update_defaults(&self, defaults: SchedulerDefaults) -> AppResult<SchedulerDefaults> {
        defaults.validate()?;
        self.db.with_connection(|conn| {
            SettingsRepository::put_json(conn, KEY_SCHEDULER_DEFAULTS, &defaults)
        })?;

        let mut profile = self.get_profile()?;
        profile.defaults = defaults.clone();
        self.store_cache(&profile);

        info!(target: "app::settings", mode = %defaults.intensity_mode, "scheduler defaults updated");
        Ok(defaults)
    }

    /// Applies a YAML profile. Sections left out keep their current value;
    /// nothing is written unless every present section validates.
    pub fn import_profile_yaml(&self, raw: &str) -> AppResult<SchedulingProfile> {
        let document: ProfileDocument = serde_yaml::from_str(raw)?;
        let mut profile = self.get_profile()?;

        let schedule = document
            .working_hours
            .map(WorkingHoursDocument::into_schedule)
            .transpose()?;
        if let Some(defaults) = &document.defaults {
            defaults.validate()?;
        }
        if schedule.is_none() && document.defaults.is_none() {
            return Err(AppError::validation(
                "profile contains neither workingHours nor defaults",
            ));
        }

        self.db.with_transaction(|conn| {
            if let Some(schedule) = &schedule {
                SettingsRepository::put_json(conn, KEY_WORKING_SCHEDULE, schedule)?;
            }
            if let Some(defaults) = &document.defaults {
                SettingsRepository::put_json(conn, KEY_SCHEDULER_DEFAULTS, defaults)?;
            }
            Ok(())
        })?;

        if let Some(schedule) = schedule {
            profile.working_schedule = schedule;
        }
        if let Some(defaults) = document.defaults {
            profile.defaults = defaults;
        }
        self.store_cache(&profile);

        info!(target: "app::settings", "scheduling profile imported");
        Ok(profile)
    }

    pub fn export_profile_yaml(&self) -> AppResult<String> {
        let profile = self.get_profile()?;
        let document = ProfileDocument {
            working_hours: Some(WorkingHoursDocument::from_schedule(&profile.working_schedule)),
            defaults: Some(profile.defaults),
        };
        Ok(serde_yaml::to_string(&document)?)
    }

    pub fn invalidate_cache(&self) {
        if let Ok(mut guard) = self.cache.write() {
            *guard = None;
        }
    }

    fn load_profile(&self) -> AppResult<SchedulingProfile> {
        self.db.with_connection(|conn| {
            let working_schedule = read_or_default(
                SettingsRepository::get_json::<WorkingSchedule>(conn, KEY_WORKING_SCHEDULE),
                KEY_WORKING_SCHEDULE,
            )?;
            let defaults = read_or_default(
                SettingsRepository::get_json::<SchedulerDefaults>(conn, KEY_SCHEDULER_DEFAULTS),
                KEY_SCHEDULER_DEFAULTS,
            )?;
            Ok(SchedulingProfile {
                working_schedule,
                defaults,
            })
        })
    }

    fn store_cache(&self, profile: &SchedulingProfile) {
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(profile.clone());
        }
    }
}

/// Missing keys fall back to defaults; so do unreadable values, with a
/// warning, so one bad row cannot lock the user out of scheduling.
fn read_or_default<T: Default>(value: AppResult<Option<T>>, key: &str) -> AppResult<T> {
    match value {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Ok(T::default()),
        Err(AppError::Serialization(err)) => {
            warn!(target: "app::settings", key, error = %err, "stored setting unreadable; using default");
            Ok(T::default())
        }
        Err(err) => Err(err),
    }
}
