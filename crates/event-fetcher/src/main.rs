//! event-fetcher: FB Analyzer Event Fetcher Main Binary
//!
//! Stores monitored Facebook pages, fetches their events from the Graph
//! API (on demand and on a fixed interval), and hands fetched events to
//! the analyzer queue.
//!
//! Usage:
//!   event-fetcher            - Start the service
//!   event-fetcher --help     - Show help

use std::sync::Arc;

use ef_api::AppState;
use ef_core::{Config, Store};
use ef_facebook::{EventFetcher, GraphApi};
use ef_queue::QueuePublisher;
use ef_schedule::Scheduler;
use tracing_subscriber::EnvFilter;

/// Run mode
enum RunMode {
    /// Start the service
    Server,
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match parse_args() {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("event-fetcher {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Server => {}
    }

    // Load .env file
    dotenvy::dotenv().ok();

    // Load configuration (file + environment)
    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    // Initialize logging; RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    tracing::info!("Starting event-fetcher...");

    run_server(config).await
}

/// Parse command line arguments
fn parse_args() -> RunMode {
    let args: Vec<String> = std::env::args().collect();

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }

    RunMode::Server
}

/// Print help message
fn print_help() {
    println!("event-fetcher - FB Analyzer Event Fetcher Service");
    println!();
    println!("Usage:");
    println!("  event-fetcher            Start the service");
    println!("  event-fetcher --help     Show this help message");
    println!("  event-fetcher --version  Show version");
    println!();
    println!("Environment Variables:");
    println!("  DB_PATH                SQLite database path (default: data/event-fetcher.db)");
    println!("  REDIS_HOST             Broker host (default: redis)");
    println!("  REDIS_PORT             Broker port (default: 6379)");
    println!("  REDIS_URL              Full broker URL (overrides host/port)");
    println!("  FACEBOOK_ACCESS_TOKEN  Graph API access token");
    println!("  FACEBOOK_APP_ID        Graph app id (app-token fallback)");
    println!("  FACEBOOK_APP_SECRET    Graph app secret (app-token fallback)");
    println!("  LOG_LEVEL              Log level (default: info; RUST_LOG wins)");
    println!("  FETCH_INTERVAL         Per-page fetch interval in seconds (default: 3600)");
    println!("  MAX_PAGES_PER_FETCH    Pages per scheduler pass (default: 10)");
    println!("  MAX_EVENTS_PER_PAGE    Event fetch limit per page (default: 100)");
    println!("  API_PORT               HTTP API port (default: 8000)");
}

/// Wire the components and run until Ctrl+C
async fn run_server(config: Config) -> anyhow::Result<()> {
    let store = Arc::new(
        Store::new(&config.database.db_path)
            .map_err(|e| anyhow::anyhow!("Failed to open database: {}", e))?,
    );
    tracing::info!("Database ready at {}", config.database.db_path);

    let graph = GraphApi::new(&config.facebook);
    let fetcher = Arc::new(EventFetcher::new(
        Arc::clone(&store),
        graph,
        config.fetch.max_events_per_page,
    ));

    // The broker is optional: without it the service still serves the API,
    // but schedule endpoints fail and the scheduler stays off.
    let queue = match QueuePublisher::connect(&config.redis.url()).await {
        Ok(queue) => Some(queue),
        Err(e) => {
            tracing::error!("Failed to connect to Redis: {}", e);
            None
        }
    };

    let scheduler_handle = match queue.clone() {
        Some(queue) => {
            let handle = Scheduler::new(
                Arc::clone(&store),
                Arc::clone(&fetcher),
                queue,
                config.fetch.interval_secs,
                config.fetch.max_pages_per_fetch,
                config.fetch.max_events_per_page,
            )
            .start();
            Some(handle)
        }
        None => {
            tracing::warn!("Scheduler disabled (no broker connection)");
            None
        }
    };

    let api_port = config.api.port;
    let state = AppState {
        config,
        store,
        fetcher,
        queue,
    };

    let api_handle = tokio::spawn(async move {
        if let Err(e) = ef_api::start_server(api_port, state).await {
            tracing::error!("HTTP API error: {}", e);
        }
    });
    tracing::info!("HTTP API server started on port {}", api_port);

    tracing::info!("event-fetcher initialized successfully");
    tracing::info!("Press Ctrl+C to exit");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");

    if let Some(handle) = scheduler_handle {
        handle.stop().await;
    }
    api_handle.abort();

    tracing::info!("Shutdown complete");
    Ok(())
}
