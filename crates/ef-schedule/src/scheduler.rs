//! Periodic fetch scheduler
//!
//! Polls the schedule state in Redis once a minute and fetches events for
//! pages whose interval has elapsed. The loop is sequential, so fetches for
//! the same page never overlap.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use ef_core::Store;
use ef_facebook::EventFetcher;
use ef_queue::{FetchConfigEntry, QueuePublisher};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// How often the schedule state is polled
const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Queue operations the scheduler depends on.
///
/// Implemented by the Redis publisher; the seam keeps the loop testable
/// without a live broker.
#[async_trait]
pub trait ScheduleQueue: Send + Sync {
    /// Page ids currently scheduled for periodic fetching
    async fn scheduled_pages(&self) -> ef_queue::Result<Vec<i64>>;

    /// Schedule state for one page, if any
    async fn fetch_config(&self, page_id: i64) -> ef_queue::Result<Option<FetchConfigEntry>>;

    /// Write back schedule state for one page
    async fn store_fetch_config(&self, entry: &FetchConfigEntry) -> ef_queue::Result<()>;

    /// Disable periodic fetching for a page
    async fn unschedule_page_fetch(&self, page_id: i64) -> ef_queue::Result<()>;

    /// Hand fetched event ids to the analyzer
    async fn queue_events_for_analysis(&self, event_ids: &[i64]) -> ef_queue::Result<()>;
}

#[async_trait]
impl ScheduleQueue for QueuePublisher {
    async fn scheduled_pages(&self) -> ef_queue::Result<Vec<i64>> {
        QueuePublisher::scheduled_pages(self).await
    }

    async fn fetch_config(&self, page_id: i64) -> ef_queue::Result<Option<FetchConfigEntry>> {
        QueuePublisher::fetch_config(self, page_id).await
    }

    async fn store_fetch_config(&self, entry: &FetchConfigEntry) -> ef_queue::Result<()> {
        QueuePublisher::store_fetch_config(self, entry).await
    }

    async fn unschedule_page_fetch(&self, page_id: i64) -> ef_queue::Result<()> {
        QueuePublisher::unschedule_page_fetch(self, page_id).await
    }

    async fn queue_events_for_analysis(&self, event_ids: &[i64]) -> ef_queue::Result<()> {
        QueuePublisher::queue_events_for_analysis(self, event_ids).await
    }
}

/// Handle for a running scheduler
pub struct SchedulerHandle {
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the scheduler and wait for the current pass to finish
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.await;
    }
}

/// Fixed-interval fetch scheduler
pub struct Scheduler<Q: ScheduleQueue> {
    store: Arc<Store>,
    fetcher: Arc<EventFetcher>,
    queue: Q,
    /// Interval used when re-seeding a page with missing schedule state
    default_interval: u64,
    /// Cap on due pages processed per pass
    max_pages_per_pass: usize,
    /// Event limit per scheduled fetch
    max_events_per_page: usize,
}

impl<Q: ScheduleQueue + 'static> Scheduler<Q> {
    /// Create a new scheduler
    pub fn new(
        store: Arc<Store>,
        fetcher: Arc<EventFetcher>,
        queue: Q,
        default_interval: u64,
        max_pages_per_pass: usize,
        max_events_per_page: usize,
    ) -> Self {
        Self {
            store,
            fetcher,
            queue,
            default_interval,
            max_pages_per_pass,
            max_events_per_page,
        }
    }

    /// Start the scheduler loop in a background task
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
        let shutdown_tx_clone = shutdown_tx.clone();

        let handle = tokio::spawn(async move {
            info!(
                "Scheduler started (poll every {}s, max {} pages per pass)",
                POLL_INTERVAL.as_secs(),
                self.max_pages_per_pass
            );

            loop {
                tokio::select! {
                    _ = tokio::time::sleep(POLL_INTERVAL) => {
                        self.run_pass().await;
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Scheduler received shutdown request");
                        break;
                    }
                }
            }

            info!("Scheduler stopped");
        });

        SchedulerHandle {
            shutdown_tx: shutdown_tx_clone,
            handle,
        }
    }

    /// One scheduler pass: resolve schedule state and fetch due pages
    async fn run_pass(&self) {
        let now = Utc::now().timestamp();

        let page_ids = match self.queue.scheduled_pages().await {
            Ok(ids) => ids,
            Err(e) => {
                error!("Failed to get scheduled pages: {}", e);
                return;
            }
        };

        if page_ids.is_empty() {
            return;
        }

        let mut entries = Vec::with_capacity(page_ids.len());
        for page_id in page_ids {
            match self.resolve_entry(page_id).await {
                Some(entry) => entries.push(entry),
                None => continue,
            }
        }

        let due = due_entries(entries, now, self.max_pages_per_pass);
        debug!("Scheduler pass: {} due pages", due.len());

        for entry in due {
            self.process_due_page(entry, now).await;
        }
    }

    /// Load the schedule state for a page, re-seeding it when the hash
    /// entry is missing (a partial schedule write leaves the page in the
    /// set without state).
    async fn resolve_entry(&self, page_id: i64) -> Option<FetchConfigEntry> {
        match self.queue.fetch_config(page_id).await {
            Ok(Some(entry)) => Some(entry),
            Ok(None) => {
                info!(
                    "Page {} scheduled without fetch config, re-seeding with default interval",
                    page_id
                );
                let entry = FetchConfigEntry::new(page_id, self.default_interval);
                match self.queue.store_fetch_config(&entry).await {
                    Ok(()) => Some(entry),
                    Err(e) => {
                        error!("Failed to re-seed fetch config for page {}: {}", page_id, e);
                        None
                    }
                }
            }
            Err(e) => {
                error!("Failed to read fetch config for page {}: {}", page_id, e);
                None
            }
        }
    }

    /// Fetch one due page and hand its events to the analyzer queue.
    ///
    /// `last_fetch` is advanced even when the fetch attempt fails, so a
    /// broken page waits a full interval instead of retrying every pass.
    async fn process_due_page(&self, mut entry: FetchConfigEntry, now: i64) {
        let page_id = entry.page_id;

        let page = match self.store.get_page(page_id) {
            Ok(Some(page)) => page,
            Ok(None) => {
                info!("Scheduled page {} no longer exists, unscheduling", page_id);
                if let Err(e) = self.queue.unschedule_page_fetch(page_id).await {
                    error!("Failed to unschedule page {}: {}", page_id, e);
                }
                return;
            }
            Err(e) => {
                error!("Failed to load page {}: {}", page_id, e);
                return;
            }
        };

        if page.is_active {
            match self
                .fetcher
                .fetch_page_events(&page, self.max_events_per_page)
                .await
            {
                Ok(events) => {
                    let event_ids: Vec<i64> = events.iter().map(|e| e.id).collect();
                    if !event_ids.is_empty() {
                        if let Err(e) = self.queue.queue_events_for_analysis(&event_ids).await {
                            error!("Failed to queue events for analysis: {}", e);
                        }
                    }
                }
                Err(e) => {
                    error!("Scheduled fetch failed for page {}: {}", page_id, e);
                }
            }
        } else {
            debug!("Skipping inactive page {}", page_id);
        }

        entry.last_fetch = now;
        if let Err(e) = self.queue.store_fetch_config(&entry).await {
            error!("Failed to update fetch config for page {}: {}", page_id, e);
        }
    }
}

/// Select the due entries for one pass, capped at `max`
fn due_entries(entries: Vec<FetchConfigEntry>, now: i64, max: usize) -> Vec<FetchConfigEntry> {
    entries
        .into_iter()
        .filter(|entry| entry.is_due(now))
        .take(max)
        .collect()
}
