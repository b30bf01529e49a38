use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::db::repositories::task_repository::{TaskRepository, TaskRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::schedule::{BlockedInterval, CalendarEvent, HabitBlock};
use crate::models::task::{Task, TaskFilter, TaskPatch};
use crate::services::smart_scheduler;

/// Notification delivered to subscribers after a write commits.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskChange {
    Updated(Task),
    Deleted(String),
}

pub type TaskListener = Arc<dyn Fn(&TaskChange) + Send + Sync>;

/// Listener registry shared by the store implementations.
#[derive(Default)]
pub struct ChangeFeed {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(u64, TaskListener)>>,
}

impl ChangeFeed {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn subscribe(self: &Arc<Self>, listener: TaskListener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut guard) = self.listeners.write() {
            guard.push((id, listener));
        }
        Subscription {
            id,
            feed: Arc::downgrade(self),
        }
    }

    pub fn publish(&self, change: &TaskChange) {
        let listeners = match self.listeners.read() {
            Ok(guard) => guard.iter().map(|(_, listener)| Arc::clone(listener)).collect::<Vec<_>>(),
            Err(_) => {
                warn!(target: "app::store", "listener registry poisoned; change not delivered");
                return;
            }
        };
        for listener in listeners {
            listener(change);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().map(|guard| guard.len()).unwrap_or(0)
    }

    fn remove(&self, id: u64) {
        if let Ok(mut guard) = self.listeners.write() {
            guard.retain(|(existing, _)| *existing != id);
        }
    }
}

/// Handle returned by [`TaskStore::subscribe`]. Listening stops on
/// [`Subscription::unsubscribe`].
pub struct Subscription {
    id: u64,
    feed: Weak<ChangeFeed>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(feed) = self.feed.upgrade() {
            feed.remove(self.id);
        }
    }
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list_tasks(&self, filter: &TaskFilter) -> AppResult<Vec<Task>>;

    async fn get_task(&self, id: &str) -> AppResult<Option<Task>>;

    async fn insert_task(&self, task: Task) -> AppResult<Task>;

    /// Applies `patch` and returns the stored task. Unknown ids fail with
    /// `NotFound`.
    async fn update_task(&self, id: &str, patch: TaskPatch) -> AppResult<Task>;

    async fn delete_task(&self, id: &str) -> AppResult<()>;

    fn subscribe(&self, listener: TaskListener) -> Subscription;
}

/// Source of habit blocks and calendar events the scheduler must respect.
#[async_trait]
pub trait BlockedIntervalProvider: Send + Sync {
    async fn habits(&self) -> AppResult<Vec<HabitBlock>>;

    async fn calendar_events(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<CalendarEvent>>;

    /// Habit and calendar blocks touching `date`, ordered by start.
    async fn list_blocked_intervals(&self, date: NaiveDate) -> AppResult<Vec<BlockedInterval>> {
        let habits = self.habits().await?;
        let events = self.calendar_events(date, date).await?;
        let mut blocked = smart_scheduler::blocked_intervals_for_day(date, &[], &[], &habits, &events);
        blocked.sort_by(|a, b| a.interval.cmp(&b.interval));
        Ok(blocked)
    }
}

/// Fixed lists, mostly for tests and offline use.
#[derive(Debug, Clone, Default)]
pub struct StaticIntervalProvider {
    habits: Vec<HabitBlock>,
    events: Vec<CalendarEvent>,
}

impl StaticIntervalProvider {
    pub fn new(habits: Vec<HabitBlock>, events: Vec<CalendarEvent>) -> Self {
        Self { habits, events }
    }
}

#[async_trait]
impl BlockedIntervalProvider for StaticIntervalProvider {
    async fn habits(&self) -> AppResult<Vec<HabitBlock>> {
        Ok(self.habits.iter().filter(|habit| habit.active).cloned().collect())
    }

    async fn calendar_events(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<CalendarEvent>> {
        Ok(self
            .events
            .iter()
            .filter(|event| event.end.date() >= start && event.start.date() <= end)
            .cloned()
            .collect())
    }
}

fn patched(mut task: Task, patch: &TaskPatch) -> AppResult<Task> {
    task.apply_patch(patch);
    if let (Some(start), Some(end)) = (task.scheduled_start, task.scheduled_end) {
        if end <= start {
            return Err(AppError::validation(format!(
                "scheduled end {end} must be after start {start} for task {}",
                task.id
            )));
        }
    }
    Ok(task)
}

#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: tokio::sync::RwLock<Vec<Task>>,
    feed: Arc<ChangeFeed>,
}

impl InMemoryTaskStore {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks: tokio::sync::RwLock::new(tasks),
            feed: ChangeFeed::new(),
        }
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn list_tasks(&self, filter: &TaskFilter) -> AppResult<Vec<Task>> {
        let tasks = self.tasks.read().await;
        Ok(tasks.iter().filter(|task| filter.matches(task)).cloned().collect())
    }

    async fn get_task(&self, id: &str) -> AppResult<Option<Task>> {
        let tasks = self.tasks.read().await;
        Ok(tasks.iter().find(|task| task.id == id).cloned())
    }

    async fn insert_task(&self, task: Task) -> AppResult<Task> {
        {
            let mut tasks = self.tasks.write().await;
            if tasks.iter().any(|existing| existing.id == task.id) {
                return Err(AppError::conflict(format!("task {} already exists", task.id)));
            }
            tasks.push(task.clone());
        }
        self.feed.publish(&TaskChange::Updated(task.clone()));
        Ok(task)
    }

    async fn update_task(&self, id: &str, patch: TaskPatch) -> AppResult<Task> {
        let updated = {
            let mut tasks = self.tasks.write().await;
            let slot = tasks
                .iter_mut()
                .find(|task| task.id == id)
                .ok_or_else(AppError::not_found)?;
            let updated = patched(slot.clone(), &patch)?;
            *slot = updated.clone();
            updated
        };
        debug!(target: "app::store", task_id = id, "task updated");
        self.feed.publish(&TaskChange::Updated(updated.clone()));
        Ok(updated)
    }

    async fn delete_task(&self, id: &str) -> AppResult<()> {
        {
            let mut tasks = self.tasks.write().await;
            let before = tasks.len();
            tasks.retain(|task| task.id != id);
            if tasks.len() == before {
                return Err(AppError::not_found());
            }
        }
        self.feed.publish(&TaskChange::Deleted(id.to_string()));
        Ok(())
    }

    fn subscribe(&self, listener: TaskListener) -> Subscription {
        self.feed.subscribe(listener)
    }
}

/// SQLite-backed store; each call runs on the blocking pool.
pub struct SqliteTaskStore {
    db: Arc<DbPool>,
    feed: Arc<ChangeFeed>,
}

impl SqliteTaskStore {
    pub fn new(db: DbPool) -> Self {
        Self {
            db: Arc::new(db),
            feed: ChangeFeed::new(),
        }
    }

    async fn run_blocking<T, F>(&self, work: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&DbPool) -> AppResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || work(&db))
            .await
            .map_err(|err| AppError::other(format!("task store worker failed: {err}")))?
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn list_tasks(&self, filter: &TaskFilter) -> AppResult<Vec<Task>> {
        let filter = filter.clone();
        self.run_blocking(move |db| {
            db.with_connection(|conn| {
                let rows = match filter.scheduled_between {
                    Some((start, end)) => TaskRepository::list_scheduled_between(conn, start, end)?,
                    None => TaskRepository::list_all(conn)?,
                };
                let mut tasks = Vec::with_capacity(rows.len());
                for row in rows {
                    let task = row.into_task()?;
                    if filter.matches(&task) {
                        tasks.push(task);
                    }
                }
                Ok(tasks)
            })
        })
        .await
    }

    async fn get_task(&self, id: &str) -> AppResult<Option<Task>> {
        let id = id.to_string();
        self.run_blocking(move |db| {
            db.with_connection(|conn| {
                TaskRepository::find_by_id(conn, &id)?
                    .map(TaskRow::into_task)
                    .transpose()
            })
        })
        .await
    }

    async fn insert_task(&self, task: Task) -> AppResult<Task> {
        let row = TaskRow::from_task(&task)?;
        self.run_blocking(move |db| db.with_connection(|conn| TaskRepository::insert(conn, &row)))
            .await?;
        self.feed.publish(&TaskChange::Updated(task.clone()));
        Ok(task)
    }

    async fn update_task(&self, id: &str, patch: TaskPatch) -> AppResult<Task> {
        let id_owned = id.to_string();
        let updated = self
            .run_blocking(move |db| {
                db.with_transaction(|conn| {
                    let current = TaskRepository::find_by_id(conn, &id_owned)?
                        .ok_or_else(AppError::not_found)?
                        .into_task()?;
                    let updated = patched(current, &patch)?;
                    TaskRepository::update(conn, &TaskRow::from_task(&updated)?)?;
                    Ok(updated)
                })
            })
            .await?;
        debug!(target: "app::store", task_id = id, "task updated");
        self.feed.publish(&TaskChange::Updated(updated.clone()));
        Ok(updated)
    }

    async fn delete_task(&self, id: &str) -> AppResult<()> {
        let id_owned = id.to_string();
        self.run_blocking(move |db| db.with_connection(|conn| TaskRepository::delete(conn, &id_owned)))
            .await?;
        self.feed.publish(&TaskChange::Deleted(id.to_string()));
        Ok(())
    }

    fn subscribe(&self, listener: TaskListener) -> Subscription {
        self.feed.subscribe(listener)
    }
}
