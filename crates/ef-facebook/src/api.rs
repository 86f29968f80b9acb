//! Facebook Graph API client

use ef_core::FacebookConfig;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::error::{FacebookError, Result};

/// Facebook Graph API base URL
const GRAPH_API_URL: &str = "https://graph.facebook.com/v18.0";

/// Fields requested when looking up a page
const PAGE_FIELDS: &str = "name,description,link";

/// Fields requested when listing a page's events
const EVENT_FIELDS: &str =
    "id,name,description,start_time,end_time,place,is_online,attending_count,interested_count";

/// Facebook Graph API client
#[derive(Clone)]
pub struct GraphApi {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl GraphApi {
    /// Create a new Graph API client.
    ///
    /// Uses the configured access token when present, otherwise falls back
    /// to the `{app_id}|{app_secret}` app token. Without either the client
    /// still works but the Graph will reject most requests.
    pub fn new(config: &FacebookConfig) -> Self {
        let access_token = resolve_token(config);
        if access_token.is_none() {
            warn!("Facebook access token not provided. Some functionality may be limited.");
        }

        Self {
            client: Client::new(),
            base_url: GRAPH_API_URL.to_string(),
            access_token,
        }
    }

    /// Point the client at a different base URL (for testing)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Get page metadata (name, description, link)
    pub async fn get_page_info(&self, fb_page_id: &str) -> Result<PageInfo> {
        let url = format!("{}/{}", self.base_url, fb_page_id);

        debug!("Fetching page info for {}", fb_page_id);

        let mut query = vec![("fields", PAGE_FIELDS.to_string())];
        if let Some(token) = &self.access_token {
            query.push(("access_token", token.clone()));
        }

        let response = self.client.get(&url).query(&query).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Facebook API error: {} - {}", status, body);
            return Err(FacebookError::Api(format!("{} - {}", status, body)));
        }

        let body = response.text().await?;
        let info: PageInfo = serde_json::from_str(&body)?;
        debug!("Got page info: {:?}", info);

        Ok(info)
    }

    /// List upcoming and past events for a page
    pub async fn get_page_events(&self, fb_page_id: &str, limit: usize) -> Result<Vec<GraphEvent>> {
        let url = format!("{}/{}/events", self.base_url, fb_page_id);

        debug!("Fetching up to {} events for page {}", limit, fb_page_id);

        let mut query = vec![
            ("fields", EVENT_FIELDS.to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(token) = &self.access_token {
            query.push(("access_token", token.clone()));
        }

        let response = self.client.get(&url).query(&query).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Facebook API error: {} - {}", status, body);
            return Err(FacebookError::Api(format!("{} - {}", status, body)));
        }

        let body = response.text().await?;
        let events: EventsResponse = serde_json::from_str(&body)?;

        Ok(events.data)
    }
}

/// Resolve the effective Graph API token from the configuration
fn resolve_token(config: &FacebookConfig) -> Option<String> {
    let nonempty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());

    if let Some(token) = nonempty(&config.access_token) {
        return Some(token);
    }

    match (nonempty(&config.app_id), nonempty(&config.app_secret)) {
        (Some(app_id), Some(app_secret)) => Some(format!("{}|{}", app_id, app_secret)),
        _ => None,
    }
}

// =============================================================================
// Data structures for Graph API responses
// =============================================================================

/// Page metadata as returned by the Graph
#[derive(Debug, Deserialize)]
pub struct PageInfo {
    pub name: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    data: Vec<GraphEvent>,
}

/// A raw event record from the Graph
#[derive(Debug, Deserialize)]
pub struct GraphEvent {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub place: Option<GraphPlace>,
    pub is_online: Option<bool>,
    pub attending_count: Option<i64>,
    pub interested_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct GraphPlace {
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn api_for(server: &mockito::ServerGuard, token: Option<&str>) -> GraphApi {
        let config = FacebookConfig {
            app_id: None,
            app_secret: None,
            access_token: token.map(String::from),
        };
        GraphApi::new(&config).with_base_url(&server.url())
    }

    #[test]
    fn test_resolve_token_prefers_access_token() {
        let config = FacebookConfig {
            app_id: Some("123".to_string()),
            app_secret: Some("secret".to_string()),
            access_token: Some("user-token".to_string()),
        };
        assert_eq!(resolve_token(&config).as_deref(), Some("user-token"));
    }

    #[test]
    fn test_resolve_token_app_token_fallback() {
        let config = FacebookConfig {
            app_id: Some("123".to_string()),
            app_secret: Some("secret".to_string()),
            access_token: None,
        };
        assert_eq!(resolve_token(&config).as_deref(), Some("123|secret"));

        let empty = FacebookConfig {
            app_id: Some("123".to_string()),
            app_secret: Some(String::new()),
            access_token: Some(String::new()),
        };
        assert_eq!(resolve_token(&empty), None);
    }

    #[tokio::test]
    async fn test_get_page_info() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/12345")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("fields".into(), PAGE_FIELDS.into()),
                Matcher::UrlEncoded("access_token".into(), "token".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name":"Town Hall","link":"https://facebook.com/townhall"}"#)
            .create_async()
            .await;

        let api = api_for(&server, Some("token"));
        let info = api.get_page_info("12345").await.unwrap();

        assert_eq!(info.name.as_deref(), Some("Town Hall"));
        assert!(info.description.is_none());
        assert_eq!(info.link.as_deref(), Some("https://facebook.com/townhall"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_page_events() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/12345/events")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("fields".into(), EVENT_FIELDS.into()),
                Matcher::UrlEncoded("limit".into(), "10".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"data":[
                    {"id":"ev-1","name":"Concert","start_time":"2025-06-01T19:00:00+0000",
                     "place":{"name":"Main Square"},"attending_count":5},
                    {"id":"ev-2","is_online":true}
                ]}"#,
            )
            .create_async()
            .await;

        let api = api_for(&server, None);
        let events = api.get_page_events("12345", 10).await.unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, "ev-1");
        assert_eq!(events[0].name.as_deref(), Some("Concert"));
        assert_eq!(
            events[0].place.as_ref().and_then(|p| p.name.as_deref()),
            Some("Main Square")
        );
        assert_eq!(events[1].id, "ev-2");
        assert_eq!(events[1].is_online, Some(true));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_page_events_empty_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/12345/events")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{}"#)
            .create_async()
            .await;

        let api = api_for(&server, None);
        let events = api.get_page_events("12345", 10).await.unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_json_body_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/12345")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let api = api_for(&server, None);
        let err = api.get_page_info("12345").await.unwrap_err();
        assert!(matches!(err, FacebookError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_graph_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/12345")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":{"message":"Invalid OAuth access token"}}"#)
            .create_async()
            .await;

        let api = api_for(&server, None);
        let err = api.get_page_info("12345").await.unwrap_err();
        assert!(matches!(err, FacebookError::Api(_)));
        assert!(err.to_string().contains("400"));
    }
}
