pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use error::{AppError, AppResult};
pub use services::capacity_service::{calculate_day_capacity, calculate_week_capacity};
pub use services::command_service::SchedulingCommandService;
pub use services::schedule_analyzer::analyze_schedule;
pub use services::smart_scheduler::{
    apply_schedule_preview, generate_smart_schedule, unschedule_all_tasks,
};
