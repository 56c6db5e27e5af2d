//! TCP accept loop.
//!
//! Binds the listener and spawns one [`handle_connection`] task per accepted
//! client. Every task gets its own [`CommandExecutor`] clone over the one
//! shared [`MetricStore`].

use crate::commands::CommandExecutor;
use crate::config::ServerConfig;
use crate::connection::{handle_connection, ConnectionStats};
use crate::storage::MetricStore;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// A bound, not yet running, server.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    store: Arc<MetricStore>,
    stats: Arc<ConnectionStats>,
    max_buffer_size: usize,
}

impl Server {
    /// Binds to the configured address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn bind(config: &ServerConfig, store: Arc<MetricStore>) -> io::Result<Self> {
        let listener = TcpListener::bind(config.bind_address()).await?;
        info!(addr = %listener.local_addr()?, "Listening");

        Ok(Self {
            listener,
            store,
            stats: Arc::new(ConnectionStats::new()),
            max_buffer_size: config.max_buffer_size,
        })
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Returns the shared connection statistics.
    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Accepts connections until `shutdown` completes.
    ///
    /// Connection tasks already running are left to finish on their own.
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        tokio::select! {
            _ = self.accept_loop() => {}
            _ = shutdown => {
                info!("Shutdown signal received, stopping server...");
            }
        }
    }

    async fn accept_loop(&self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let executor = CommandExecutor::new(Arc::clone(&self.store));
                    let stats = Arc::clone(&self.stats);
                    let max_buffer_size = self.max_buffer_size;

                    tokio::spawn(async move {
                        handle_connection(stream, addr, executor, stats, max_buffer_size).await;
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}
