pub mod capacity_insights;
pub mod capacity_service;
pub mod command_service;
pub mod schedule_analyzer;
pub mod schedule_utils;
pub mod settings_service;
pub mod smart_scheduler;
pub mod task_store;
