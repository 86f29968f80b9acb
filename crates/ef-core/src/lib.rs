//! ef-core: Event Fetcher Core Library
//!
//! Shared configuration, domain records, the SQLite store, and the
//! common error type for the event fetcher service.

pub mod config;
pub mod error;
pub mod models;
pub mod store;

pub use config::{ApiConfig, Config, DatabaseConfig, FacebookConfig, FetchConfig, RedisConfig};
pub use error::{Error, Result};
pub use models::{Event, Group, GroupCreate, NewEvent, Page, PageCreate, Post};
pub use store::Store;
