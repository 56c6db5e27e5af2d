//! # tickstore - An In-Memory Time-Series Metrics Store
//!
//! tickstore keeps numeric samples per metric key and serves them over a
//! persistent TCP connection speaking a compact line protocol. Clients `put`
//! samples and `get` whole series back, sorted by timestamp.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              tickstore                                  │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Executor   │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │                         │
//! │                            ▼                  ▼                         │
//! │  ┌─────────────────────────────┐   ┌──────────────────────────────┐    │
//! │  │        Line Protocol        │   │         MetricStore          │    │
//! │  │  decode(text) -> commands   │   │  ┌────────┐ ┌────────┐       │    │
//! │  │  encode(results) -> text    │   │  │Shard 0 │ │Shard 1 │ ...N  │    │
//! │  └─────────────────────────────┘   │  └────────┘ └────────┘       │    │
//! │                                    └──────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use tickstore::{MetricStore, Server, ServerConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let store = Arc::new(MetricStore::new());
//!     let server = Server::bind(&ServerConfig::default(), store).await?;
//!     server.run(async { let _ = tokio::signal::ctrl_c().await; }).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Wire Protocol
//!
//! ```text
//! put <key> <value> <timestamp>\n     ->  ok\n\n
//! get <key>\n                         ->  ok\n<key> <value> <timestamp>\n...\n
//! get *\n                             ->  every series
//! <anything malformed>\n              ->  error\n<message>\n\n
//! ```
//!
//! A message may carry several command lines; they run in order and share one
//! response. One malformed line rejects the whole message.
//!
//! ## Module Overview
//!
//! - [`protocol`]: Line protocol codec
//! - [`storage`]: Sharded in-memory metric store
//! - [`commands`]: Command executor
//! - [`connection`]: Per-client framing and dispatch
//! - [`server`]: TCP accept loop
//! - [`config`]: Command-line and environment configuration
//! - [`client`]: Async client for the wire protocol

pub mod client;
pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use client::{Client, ClientError};
pub use commands::CommandExecutor;
pub use config::ServerConfig;
pub use connection::{handle_connection, ConnectionError, ConnectionStats};
pub use protocol::{Command, CommandResult, ProtocolError, Response};
pub use server::Server;
pub use storage::{MetricStore, Sample, SeriesSet};

/// The default port tickstore listens on
pub const DEFAULT_PORT: u16 = 8888;

/// The default host tickstore binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of tickstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
