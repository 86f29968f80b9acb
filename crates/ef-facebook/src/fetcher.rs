//! Event fetch orchestration
//!
//! Combines the Graph API client with the store: registering pages
//! (enriched with Graph metadata) and fetching/upserting their events.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ef_core::{Event, NewEvent, Page, PageCreate, Store};
use tracing::{error, info, warn};

use crate::api::{GraphApi, GraphEvent};
use crate::error::Result;

/// Fetches events from the Graph API and stores them
pub struct EventFetcher {
    store: Arc<Store>,
    graph: GraphApi,
    max_events_per_page: usize,
}

impl EventFetcher {
    /// Create a new fetcher
    pub fn new(store: Arc<Store>, graph: GraphApi, max_events_per_page: usize) -> Self {
        Self {
            store,
            graph,
            max_events_per_page,
        }
    }

    /// Register a page for monitoring.
    ///
    /// Idempotent: when a page with the same `fb_page_id` already exists it
    /// is returned unchanged. Missing name/description/URL are filled in
    /// from the Graph; a Graph failure is logged and the page is created
    /// with the caller-provided data only.
    pub async fn register_page(&self, mut page: PageCreate) -> Result<Page> {
        if let Some(existing) = self.store.get_page_by_fb_id(&page.fb_page_id)? {
            return Ok(existing);
        }

        match self.graph.get_page_info(&page.fb_page_id).await {
            Ok(info) => {
                if page.name.is_none() {
                    page.name = info.name;
                }
                if page.description.is_none() {
                    page.description = info.description;
                }
                if page.page_url.is_none() {
                    page.page_url = info.link;
                }
            }
            Err(e) => {
                // Continue with the caller-provided data
                error!("Failed to fetch page info from Facebook: {}", e);
            }
        }

        let created = self.store.insert_page(&page)?;
        info!("Registered page {} ({})", created.fb_page_id, created.name);
        Ok(created)
    }

    /// Fetch events for a page and upsert them into the store.
    ///
    /// A Graph-side failure is logged and yields an empty list; storage
    /// failures propagate. The requested limit is clamped to the configured
    /// per-page maximum.
    pub async fn fetch_page_events(&self, page: &Page, limit: usize) -> Result<Vec<Event>> {
        let limit = limit.min(self.max_events_per_page);

        let graph_events = match self.graph.get_page_events(&page.fb_page_id, limit).await {
            Ok(events) => events,
            Err(e) => {
                error!("Failed to fetch events from Facebook: {}", e);
                return Ok(Vec::new());
            }
        };

        let mut events = Vec::with_capacity(graph_events.len());
        for raw in graph_events {
            let event = map_event(raw, page.id);
            events.push(self.store.upsert_event(&event)?);
        }

        info!(
            "Fetched {} events for page {}",
            events.len(),
            page.fb_page_id
        );
        Ok(events)
    }
}

/// Map a raw Graph event to a storable record
fn map_event(raw: GraphEvent, page_row_id: i64) -> NewEvent {
    let event_url = format!("https://facebook.com/events/{}", raw.id);

    NewEvent {
        fb_page_id: page_row_id,
        name: raw.name.unwrap_or_else(|| "Unnamed Event".to_string()),
        description: raw.description,
        event_url: Some(event_url),
        location: raw.place.and_then(|p| p.name),
        start_time: raw.start_time.as_deref().and_then(parse_graph_time),
        end_time: raw.end_time.as_deref().and_then(parse_graph_time),
        is_online: raw.is_online.unwrap_or(false),
        attending_count: raw.attending_count.unwrap_or(0),
        interested_count: raw.interested_count.unwrap_or(0),
        fb_event_id: raw.id,
    }
}

/// Parse a Graph API timestamp.
///
/// The Graph sends ISO 8601 with `Z`, `+00:00`, or its own `+0000` offset
/// form. Unparseable values are logged and dropped.
fn parse_graph_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z"))
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| warn!("Failed to parse event time: {}", e))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ef_core::FacebookConfig;
    use mockito::Matcher;

    fn fetcher_for(server: &mockito::ServerGuard, store: Arc<Store>) -> EventFetcher {
        let config = FacebookConfig {
            app_id: None,
            app_secret: None,
            access_token: Some("test-token".to_string()),
        };
        let graph = GraphApi::new(&config).with_base_url(&server.url());
        EventFetcher::new(store, graph, 100)
    }

    #[test]
    fn test_parse_graph_time_variants() {
        let expected = Utc.with_ymd_and_hms(2025, 6, 1, 19, 0, 0).unwrap();
        assert_eq!(parse_graph_time("2025-06-01T19:00:00Z"), Some(expected));
        assert_eq!(parse_graph_time("2025-06-01T19:00:00+00:00"), Some(expected));
        assert_eq!(parse_graph_time("2025-06-01T19:00:00+0000"), Some(expected));
        assert_eq!(
            parse_graph_time("2025-06-01T21:00:00+0200"),
            Some(expected)
        );
        assert_eq!(parse_graph_time("not-a-date"), None);
    }

    #[test]
    fn test_map_event_defaults() {
        let raw = GraphEvent {
            id: "ev-1".to_string(),
            name: None,
            description: None,
            start_time: None,
            end_time: None,
            place: None,
            is_online: None,
            attending_count: None,
            interested_count: None,
        };

        let event = map_event(raw, 7);
        assert_eq!(event.fb_event_id, "ev-1");
        assert_eq!(event.fb_page_id, 7);
        assert_eq!(event.name, "Unnamed Event");
        assert_eq!(
            event.event_url.as_deref(),
            Some("https://facebook.com/events/ev-1")
        );
        assert!(!event.is_online);
        assert_eq!(event.attending_count, 0);
        assert_eq!(event.interested_count, 0);
    }

    #[tokio::test]
    async fn test_register_page_enriches_from_graph() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/12345")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"name":"Town Hall","description":"Civic events","link":"https://facebook.com/townhall"}"#,
            )
            .create_async()
            .await;

        let store = Arc::new(Store::in_memory().unwrap());
        let fetcher = fetcher_for(&server, Arc::clone(&store));

        let page = fetcher
            .register_page(PageCreate {
                fb_page_id: "12345".to_string(),
                name: None,
                description: None,
                page_url: None,
            })
            .await
            .unwrap();

        assert_eq!(page.name, "Town Hall");
        assert_eq!(page.description.as_deref(), Some("Civic events"));
        assert_eq!(page.page_url.as_deref(), Some("https://facebook.com/townhall"));
        assert!(page.is_active);
    }

    #[tokio::test]
    async fn test_register_page_is_idempotent() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/12345")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"name":"Town Hall"}"#)
            .expect(1)
            .create_async()
            .await;

        let store = Arc::new(Store::in_memory().unwrap());
        let fetcher = fetcher_for(&server, Arc::clone(&store));

        let create = PageCreate {
            fb_page_id: "12345".to_string(),
            name: None,
            description: None,
            page_url: None,
        };
        let first = fetcher.register_page(create.clone()).await.unwrap();
        let second = fetcher.register_page(create).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.list_pages(0, 100).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_page_survives_graph_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/12345")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("oops")
            .create_async()
            .await;

        let store = Arc::new(Store::in_memory().unwrap());
        let fetcher = fetcher_for(&server, Arc::clone(&store));

        let page = fetcher
            .register_page(PageCreate {
                fb_page_id: "12345".to_string(),
                name: Some("Fallback Name".to_string()),
                description: None,
                page_url: None,
            })
            .await
            .unwrap();

        assert_eq!(page.name, "Fallback Name");
    }

    #[tokio::test]
    async fn test_fetch_page_events_stores_and_updates() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/12345/events")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"data":[
                    {"id":"ev-1","name":"Concert","start_time":"2025-06-01T19:00:00+0000",
                     "place":{"name":"Main Square"},"attending_count":5,"interested_count":9},
                    {"id":"ev-2"}
                ]}"#,
            )
            .create_async()
            .await;

        let store = Arc::new(Store::in_memory().unwrap());
        let fetcher = fetcher_for(&server, Arc::clone(&store));
        let page = store
            .insert_page(&PageCreate {
                fb_page_id: "12345".to_string(),
                name: Some("Town Hall".to_string()),
                description: None,
                page_url: None,
            })
            .unwrap();

        let events = fetcher.fetch_page_events(&page, 10).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "Concert");
        assert_eq!(events[0].location.as_deref(), Some("Main Square"));
        assert_eq!(
            events[0].start_time,
            Some(Utc.with_ymd_and_hms(2025, 6, 1, 19, 0, 0).unwrap())
        );
        assert_eq!(events[1].name, "Unnamed Event");

        // a second fetch updates in place instead of duplicating
        let again = fetcher.fetch_page_events(&page, 10).await.unwrap();
        assert_eq!(again.len(), 2);
        assert_eq!(again[0].id, events[0].id);
        assert_eq!(store.list_events(None, 0, 100).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_page_events_graph_failure_yields_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/12345/events")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":{"message":"bad token"}}"#)
            .create_async()
            .await;

        let store = Arc::new(Store::in_memory().unwrap());
        let fetcher = fetcher_for(&server, Arc::clone(&store));
        let page = store
            .insert_page(&PageCreate {
                fb_page_id: "12345".to_string(),
                name: Some("Town Hall".to_string()),
                description: None,
                page_url: None,
            })
            .unwrap();

        let events = fetcher.fetch_page_events(&page, 10).await.unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_limit_is_clamped() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/12345/events")
            .match_query(Matcher::UrlEncoded("limit".into(), "3".into()))
            .with_status(200)
            .with_body(r#"{"data":[]}"#)
            .create_async()
            .await;

        let store = Arc::new(Store::in_memory().unwrap());
        let config = FacebookConfig {
            app_id: None,
            app_secret: None,
            access_token: Some("test-token".to_string()),
        };
        let graph = GraphApi::new(&config).with_base_url(&server.url());
        let fetcher = EventFetcher::new(Arc::clone(&store), graph, 3);

        let page = store
            .insert_page(&PageCreate {
                fb_page_id: "12345".to_string(),
                name: Some("Town Hall".to_string()),
                description: None,
                page_url: None,
            })
            .unwrap();

        fetcher.fetch_page_events(&page, 50).await.unwrap();
        mock.assert_async().await;
    }
}
