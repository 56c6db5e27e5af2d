//! tickstore - An In-Memory Time-Series Metrics Store
//!
//! This is the main entry point for the tickstore server.
//! It reads the configuration, sets up logging and the shared store, and
//! runs the accept loop until Ctrl+C.

use clap::Parser;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tickstore::{MetricStore, Server, ServerConfig};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    info!(version = tickstore::VERSION, "Starting tickstore");

    // Shared across all connections for the life of the process
    let store = Arc::new(MetricStore::new());

    let server = Server::bind(&config, Arc::clone(&store)).await?;
    let stats = server.stats();

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    server.run(shutdown).await;

    let storage = store.stats();
    info!(
        connections = stats.connections_accepted.load(Ordering::Relaxed),
        commands = stats.commands_processed.load(Ordering::Relaxed),
        series = storage.series,
        samples = storage.samples,
        "Server shutdown complete"
    );
    Ok(())
}
