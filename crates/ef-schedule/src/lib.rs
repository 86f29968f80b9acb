//! ef-schedule: fixed-interval periodic fetching
//!
//! Runs the background loop that fetches events for scheduled pages and
//! hands them to the analyzer queue.

pub mod scheduler;

pub use scheduler::{ScheduleQueue, Scheduler, SchedulerHandle};
