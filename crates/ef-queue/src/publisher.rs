//! Redis broker hand-off
//!
//! Three keys make up the contract with the downstream analyzer:
//! - `events_to_analyze`: list of event ids awaiting analysis (LPUSH)
//! - `scheduled_pages`: set of page ids with periodic fetching enabled
//! - `page_fetch_config`: hash of per-page schedule state, JSON values

use std::time::Duration;

use redis::{
    AsyncCommands, Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tracing::{debug, info};

use crate::error::Result;
use crate::state::FetchConfigEntry;

/// Queue of event ids for the analyzer service
const EVENTS_QUEUE: &str = "events_to_analyze";

/// Set of page ids with periodic fetching enabled
const SCHEDULED_PAGES: &str = "scheduled_pages";

/// Hash of per-page schedule state
const FETCH_CONFIG: &str = "page_fetch_config";

/// Publisher for the analyzer hand-off and schedule state
///
/// Cheap to clone; the underlying connection manager reconnects on its own
/// after transient broker outages.
#[derive(Clone)]
pub struct QueuePublisher {
    conn: ConnectionManager,
}

impl QueuePublisher {
    /// Connect to the broker.
    ///
    /// Fails fast so the caller can decide to run without a broker.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_secs(5));

        let client = Client::open(redis_url)?;
        let conn = client.get_connection_manager_with_config(config).await?;

        info!("Connected to Redis at {}", redis_url);
        Ok(Self { conn })
    }

    /// Queue events for analysis by the event analyzer service
    pub async fn queue_events_for_analysis(&self, event_ids: &[i64]) -> Result<()> {
        let mut conn = self.conn.clone();
        for event_id in event_ids {
            let _: () = conn.lpush(EVENTS_QUEUE, event_id).await?;
        }
        info!("Queued {} events for analysis", event_ids.len());
        Ok(())
    }

    /// Enable periodic fetching for a page
    pub async fn schedule_page_fetch(&self, page_id: i64, interval: u64) -> Result<()> {
        let mut conn = self.conn.clone();

        let _: () = conn.sadd(SCHEDULED_PAGES, page_id).await?;

        let entry = FetchConfigEntry::new(page_id, interval);
        let _: () = conn
            .hset(FETCH_CONFIG, page_id, serde_json::to_string(&entry)?)
            .await?;

        info!(
            "Scheduled regular fetching for page {} every {} seconds",
            page_id, interval
        );
        Ok(())
    }

    /// Disable periodic fetching for a page
    pub async fn unschedule_page_fetch(&self, page_id: i64) -> Result<()> {
        let mut conn = self.conn.clone();

        let _: () = conn.srem(SCHEDULED_PAGES, page_id).await?;
        let _: () = conn.hdel(FETCH_CONFIG, page_id).await?;

        info!("Unscheduled regular fetching for page {}", page_id);
        Ok(())
    }

    /// Page ids currently scheduled for periodic fetching
    pub async fn scheduled_pages(&self) -> Result<Vec<i64>> {
        let mut conn = self.conn.clone();
        let page_ids: Vec<i64> = conn.smembers(SCHEDULED_PAGES).await?;
        Ok(page_ids)
    }

    /// Schedule state for one page, if any
    pub async fn fetch_config(&self, page_id: i64) -> Result<Option<FetchConfigEntry>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.hget(FETCH_CONFIG, page_id).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Write back schedule state for one page
    pub async fn store_fetch_config(&self, entry: &FetchConfigEntry) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .hset(FETCH_CONFIG, entry.page_id, serde_json::to_string(entry)?)
            .await?;
        debug!(
            "Stored fetch config for page {} (last_fetch = {})",
            entry.page_id, entry.last_fetch
        );
        Ok(())
    }
}
