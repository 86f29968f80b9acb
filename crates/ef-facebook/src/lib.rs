//! ef-facebook: Facebook Graph API integration
//!
//! Wraps the Graph API for page metadata and event listings, and
//! orchestrates fetching events into the store.

pub mod api;
pub mod error;
pub mod fetcher;

pub use api::{GraphApi, GraphEvent, GraphPlace, PageInfo};
pub use error::{FacebookError, Result};
pub use fetcher::EventFetcher;
