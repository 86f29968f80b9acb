//! ef-api: REST surface for the event fetcher service
//!
//! Page/event monitoring endpoints plus the deprecated group/post
//! surface, served over axum with permissive CORS.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::{ApiError, Result};
pub use routes::routes;
pub use server::{AppState, start_server};
