//! HTTP API Server
//!
//! Starts and manages the axum-based HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use ef_core::{Config, Store};
use ef_facebook::EventFetcher;
use ef_queue::QueuePublisher;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::routes::routes;

/// Shared application state
///
/// `queue` is `None` when the broker was unreachable at startup; the
/// schedule endpoints answer 500 in that mode and the analyzer hand-off
/// is skipped.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<Store>,
    pub fetcher: Arc<EventFetcher>,
    pub queue: Option<QueuePublisher>,
}

/// Start the HTTP API server
pub async fn start_server(port: u16, state: AppState) -> anyhow::Result<()> {
    let app = Router::new()
        .merge(routes())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("HTTP API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
