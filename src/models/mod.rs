pub mod analysis;
pub mod capacity;
pub mod command;
pub mod schedule;
pub mod scheduler;
pub mod settings;
pub mod task;
