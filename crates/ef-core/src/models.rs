//! Domain records for monitored pages and fetched events
//!
//! Legacy group/post records are kept for the deprecated API surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A monitored Facebook page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    pub id: i64,
    pub fb_page_id: String,
    pub name: String,
    pub description: Option<String>,
    pub page_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for registering a page to monitor
///
/// Only `fb_page_id` is required; the remaining fields are enriched from the
/// Graph API when missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageCreate {
    pub fb_page_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub page_url: Option<String>,
}

/// A Facebook event fetched from a monitored page
///
/// `fb_page_id` holds the internal id of the owning page row, not the
/// Graph-side page id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: i64,
    pub fb_event_id: String,
    pub fb_page_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub event_url: Option<String>,
    pub location: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub timezone: Option<String>,
    pub is_online: bool,
    pub attending_count: i64,
    pub interested_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Event data as mapped from a Graph API response, ready to upsert
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub fb_event_id: String,
    pub fb_page_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub event_url: Option<String>,
    pub location: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_online: bool,
    pub attending_count: i64,
    pub interested_count: i64,
}

/// A monitored Facebook group (deprecated surface)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Group {
    pub id: i64,
    pub fb_group_id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for the deprecated group create endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupCreate {
    pub fb_group_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A Facebook group post (deprecated surface; never written any more)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub fb_post_id: String,
    pub fb_group_id: i64,
    pub content: Option<String>,
    pub author: Option<String>,
    pub post_url: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub shares_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
