//! Route definitions
//!
//! Defines all HTTP API endpoints. The collection paths keep their
//! trailing slashes; axum matches them literally.

use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers::{
    create_group, create_page, delete_group, delete_page, fetch_group_posts, fetch_page_events,
    get_event, get_group, get_page, get_post, health, list_events, list_groups, list_pages,
    list_posts, root, schedule_group_fetch, schedule_page_fetch, unschedule_page_fetch,
};
use crate::server::AppState;

/// Create the API router
pub fn routes() -> Router<AppState> {
    Router::new()
        // Service endpoints
        .route("/", get(root))
        .route("/health", get(health))
        // Page monitoring
        .route("/pages/", post(create_page).get(list_pages))
        .route("/pages/{page_id}", get(get_page).delete(delete_page))
        .route("/pages/{page_id}/fetch", post(fetch_page_events))
        .route(
            "/pages/{page_id}/schedule",
            post(schedule_page_fetch).delete(unschedule_page_fetch),
        )
        // Events
        .route("/events/", get(list_events))
        .route("/events/{event_id}", get(get_event))
        // Deprecated group/post surface
        .route("/groups/", post(create_group).get(list_groups))
        .route("/groups/{group_id}", get(get_group).delete(delete_group))
        .route("/groups/{group_id}/fetch", post(fetch_group_posts))
        .route("/groups/{group_id}/schedule", post(schedule_group_fetch))
        .route("/posts/", get(list_posts))
        .route("/posts/{post_id}", get(get_post))
}
