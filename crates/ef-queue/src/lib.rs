//! ef-queue: broker hand-off to the event analyzer
//!
//! Publishes fetched event ids to Redis and keeps the per-page
//! schedule state the scheduler reads.

pub mod error;
pub mod publisher;
pub mod state;

pub use error::{QueueError, Result};
pub use publisher::QueuePublisher;
pub use state::FetchConfigEntry;
