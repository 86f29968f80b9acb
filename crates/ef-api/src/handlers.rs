//! HTTP API handlers
//!
//! Request handlers for page/event monitoring and the deprecated
//! group/post surface.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use ef_core::{Event, Group, GroupCreate, Page, PageCreate, Post};

use crate::error::{ApiError, Result};
use crate::server::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

/// Offset/limit pagination query
#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

/// Query for listing events
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub page_id: Option<i64>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// Query for the immediate fetch endpoint
#[derive(Debug, Deserialize)]
pub struct FetchQuery {
    #[serde(default = "default_fetch_limit")]
    pub limit: usize,
}

fn default_fetch_limit() -> usize {
    10
}

/// Query for the deprecated posts listing
#[derive(Debug, Deserialize)]
pub struct PostsQuery {
    #[allow(dead_code)]
    pub group_id: Option<i64>,
    #[serde(default)]
    #[allow(dead_code)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    #[allow(dead_code)]
    pub limit: i64,
}

/// Plain message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub facebook_credentials: &'static str,
}

// ============================================================================
// Service endpoints
// ============================================================================

/// Service banner
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "FB Analyzer Event Fetcher Service".to_string(),
    })
}

/// Health check; logs the non-secret configuration surface
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    info!("DB_PATH: {}", state.config.database.db_path);
    info!("REDIS_URL: {}", state.config.redis.url());
    info!("LOG_LEVEL: {}", state.config.log_level);
    info!("FETCH_INTERVAL: {}", state.config.fetch.interval_secs);

    let facebook_credentials = if state.config.facebook.has_credentials() {
        "available"
    } else {
        "missing"
    };

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        facebook_credentials,
    })
}

// ============================================================================
// Pages
// ============================================================================

/// Add a new Facebook page to monitor
pub async fn create_page(
    State(state): State<AppState>,
    Json(payload): Json<PageCreate>,
) -> Result<Json<Page>> {
    let page = state.fetcher.register_page(payload).await?;
    Ok(Json(page))
}

/// Retrieve all monitored Facebook pages
pub async fn list_pages(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<Page>>> {
    let pages = state.store.list_pages(pagination.skip, pagination.limit)?;
    Ok(Json(pages))
}

/// Retrieve a specific Facebook page by ID
pub async fn get_page(
    State(state): State<AppState>,
    Path(page_id): Path<i64>,
) -> Result<Json<Page>> {
    let page = state
        .store
        .get_page(page_id)?
        .ok_or(ApiError::NotFound("Page not found"))?;
    Ok(Json(page))
}

/// Delete a Facebook page from monitoring
pub async fn delete_page(
    State(state): State<AppState>,
    Path(page_id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    if !state.store.delete_page(page_id)? {
        return Err(ApiError::NotFound("Page not found"));
    }
    Ok(Json(MessageResponse {
        message: "Page deleted successfully".to_string(),
    }))
}

/// Fetch events from a specific Facebook page.
///
/// Events are stored synchronously; the analyzer hand-off happens in a
/// background task so the response does not wait on the broker.
pub async fn fetch_page_events(
    State(state): State<AppState>,
    Path(page_id): Path<i64>,
    Query(query): Query<FetchQuery>,
) -> Result<Json<Vec<Event>>> {
    let page = state
        .store
        .get_page(page_id)?
        .ok_or(ApiError::NotFound("Page not found"))?;

    let events = state.fetcher.fetch_page_events(&page, query.limit).await?;

    let event_ids: Vec<i64> = events.iter().map(|e| e.id).collect();
    match &state.queue {
        Some(queue) => {
            let queue = queue.clone();
            tokio::spawn(async move {
                if let Err(e) = queue.queue_events_for_analysis(&event_ids).await {
                    error!("Failed to queue events for analysis: {}", e);
                }
            });
        }
        None => error!("Redis connection not available"),
    }

    Ok(Json(events))
}

/// Schedule regular fetching of events from a specific Facebook page
pub async fn schedule_page_fetch(
    State(state): State<AppState>,
    Path(page_id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    state
        .store
        .get_page(page_id)?
        .ok_or(ApiError::NotFound("Page not found"))?;

    let queue = state
        .queue
        .as_ref()
        .ok_or(ApiError::SchedulingFailed("Failed to schedule fetch"))?;

    queue
        .schedule_page_fetch(page_id, state.config.fetch.interval_secs)
        .await
        .map_err(|e| {
            error!("Failed to schedule page fetch: {}", e);
            ApiError::SchedulingFailed("Failed to schedule fetch")
        })?;

    Ok(Json(MessageResponse {
        message: format!("Scheduled regular fetching for page {}", page_id),
    }))
}

/// Remove a page from scheduled fetching
pub async fn unschedule_page_fetch(
    State(state): State<AppState>,
    Path(page_id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    state
        .store
        .get_page(page_id)?
        .ok_or(ApiError::NotFound("Page not found"))?;

    let queue = state
        .queue
        .as_ref()
        .ok_or(ApiError::SchedulingFailed("Failed to unschedule fetch"))?;

    queue.unschedule_page_fetch(page_id).await.map_err(|e| {
        error!("Failed to unschedule page fetch: {}", e);
        ApiError::SchedulingFailed("Failed to unschedule fetch")
    })?;

    Ok(Json(MessageResponse {
        message: format!("Unscheduled regular fetching for page {}", page_id),
    }))
}

// ============================================================================
// Events
// ============================================================================

/// Retrieve events, optionally filtered by page
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<Event>>> {
    let events = state
        .store
        .list_events(query.page_id, query.skip, query.limit)?;
    Ok(Json(events))
}

/// Retrieve a specific event by ID
pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Json<Event>> {
    let event = state
        .store
        .get_event(event_id)?
        .ok_or(ApiError::NotFound("Event not found"))?;
    Ok(Json(event))
}

// ============================================================================
// Deprecated group/post surface
// ============================================================================

/// [DEPRECATED] Add a new Facebook group to monitor
pub async fn create_group(
    State(state): State<AppState>,
    Json(payload): Json<GroupCreate>,
) -> Result<Json<Group>> {
    warn!("Using deprecated group endpoint. Please migrate to pages.");

    if let Some(existing) = state.store.get_group_by_fb_id(&payload.fb_group_id)? {
        return Ok(Json(existing));
    }
    let group = state.store.insert_group(&payload)?;
    Ok(Json(group))
}

/// [DEPRECATED] Retrieve all monitored Facebook groups
pub async fn list_groups(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<Group>>> {
    warn!("Using deprecated group endpoint. Please migrate to pages.");
    let groups = state.store.list_groups(pagination.skip, pagination.limit)?;
    Ok(Json(groups))
}

/// [DEPRECATED] Retrieve a specific Facebook group by ID
pub async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<i64>,
) -> Result<Json<Group>> {
    warn!("Using deprecated group endpoint. Please migrate to pages.");
    let group = state
        .store
        .get_group(group_id)?
        .ok_or(ApiError::NotFound("Group not found"))?;
    Ok(Json(group))
}

/// [DEPRECATED] Delete a Facebook group from monitoring
pub async fn delete_group(
    State(state): State<AppState>,
    Path(group_id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    warn!("Using deprecated group endpoint. Please migrate to pages.");
    if !state.store.delete_group(group_id)? {
        return Err(ApiError::NotFound("Group not found"));
    }
    Ok(Json(MessageResponse {
        message: "Group deleted successfully".to_string(),
    }))
}

/// [DEPRECATED] Fetch posts from a group; always empty
pub async fn fetch_group_posts(
    State(state): State<AppState>,
    Path(group_id): Path<i64>,
) -> Result<Json<Vec<Post>>> {
    warn!("Using deprecated post endpoint. Please migrate to events.");
    state
        .store
        .get_group(group_id)?
        .ok_or(ApiError::NotFound("Group not found"))?;
    Ok(Json(Vec::new()))
}

/// [DEPRECATED] Schedule group fetching; points at the pages surface
pub async fn schedule_group_fetch(
    State(state): State<AppState>,
    Path(group_id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    warn!("Using deprecated group endpoint. Please migrate to pages.");
    state
        .store
        .get_group(group_id)?
        .ok_or(ApiError::NotFound("Group not found"))?;
    Ok(Json(MessageResponse {
        message: "This functionality is deprecated. Please use /pages/{page_id}/schedule instead."
            .to_string(),
    }))
}

/// [DEPRECATED] Retrieve posts; always empty
pub async fn list_posts(Query(_query): Query<PostsQuery>) -> Json<Vec<Post>> {
    warn!("Using deprecated post endpoint. Please migrate to events.");
    Json(Vec::new())
}

/// [DEPRECATED] Retrieve a specific post; always 404
pub async fn get_post(Path(_post_id): Path<i64>) -> Result<Json<Post>> {
    warn!("Using deprecated post endpoint. Please migrate to events.");
    Err(ApiError::NotFound("Post not found"))
}
